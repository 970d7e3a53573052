use std::io;

/// Workspace-wide error taxonomy (§7).
///
/// Every fallible operation in `storage`, `bus`, `interlink`, `streams`,
/// `delta`, and `sync` defines its own crate-local `thiserror` enum
/// (`storage::StorageError`, `interlink::InterlinkError`, …) and converts
/// into this one at the boundary where the caller needs a single error
/// type; none of them leak into a workspace-wide `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Caller contract violation: null, out of range, or malformed input.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// Allocation or quota exhaustion.
    #[error("out of memory")]
    NoMem,

    /// Transport or disk I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A lookup found nothing at the requested key.
    #[error("not found")]
    NotFound,

    /// A unique-insert collided with an existing key.
    #[error("already exists")]
    AlreadyExists,

    /// The storage map reached its configured size and the transaction must abort.
    #[error("map full")]
    MapFull,

    /// The message bus's bounded queue could not accept the payload; retriable.
    #[error("queue full")]
    QueueFull,

    /// A stream or handshake wait expired.
    #[error("timeout")]
    Timeout,

    /// A malformed frame, unsupported version, or a rejected self-connect.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The transaction or handle was used after being committed, aborted, or dropped.
    #[error("invalid transaction")]
    InvalidTx,
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, NodeError>;
