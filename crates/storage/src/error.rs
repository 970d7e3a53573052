use fsyncd_core::NodeError;

/// Error taxonomy for the storage engine (§4.1.2).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying LMDB environment or transaction failure.
    #[error("lmdb error: {0}")]
    Backend(#[from] heed3::Error),

    /// Disk I/O failure opening or growing the environment.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A lookup found nothing at the requested key.
    #[error("not found")]
    NotFound,

    /// A unique-insert collided with an existing key (e.g. `add_dir` on a known path).
    #[error("already exists")]
    AlreadyExists,

    /// The environment reached `map_size`; the write transaction must abort.
    #[error("map full")]
    MapFull,

    /// A record failed to decode from its stored byte representation.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The transaction was already committed or aborted.
    #[error("invalid transaction")]
    InvalidTx,
}

impl From<StorageError> for NodeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => NodeError::NotFound,
            StorageError::AlreadyExists => NodeError::AlreadyExists,
            StorageError::MapFull => NodeError::MapFull,
            StorageError::InvalidTx => NodeError::InvalidTx,
            StorageError::Io(e) => NodeError::Io(e),
            StorageError::Backend(e) => NodeError::InvalidArg(e.to_string()),
            StorageError::Corrupt(msg) => NodeError::InvalidArg(msg),
        }
    }
}

/// Convenience alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
