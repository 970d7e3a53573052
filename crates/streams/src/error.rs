use fsyncd_core::NodeError;

/// Error taxonomy for the remote stream factory (§4.4).
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A request for the same `(src, dst, cookie)` is already outstanding.
    #[error("a stream request for this (src, dst, cookie) is already pending")]
    AlreadyPending,

    /// `stream_id` names no stream this factory knows about.
    #[error("unknown stream id {0}")]
    UnknownStream(u32),

    /// Data arrived out of order and no contiguous run ever completed the
    /// gap within the reconnect-wait budget (§4.4.4 Ordering).
    #[error("stream stalled waiting for missing data")]
    Timeout,

    /// The stream's local endpoint (reader or writer) has gone away.
    #[error("stream closed")]
    Closed,

    /// Underlying I/O failure surfaced through a stream endpoint.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StreamError> for NodeError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io(e) => NodeError::Io(e),
            StreamError::Timeout => NodeError::Timeout,
            StreamError::UnknownStream(_) => NodeError::NotFound,
            StreamError::AlreadyPending => NodeError::AlreadyExists,
            StreamError::Closed => NodeError::Protocol(err.to_string()),
        }
    }
}

/// Convenience alias for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
