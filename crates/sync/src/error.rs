use fsyncd_core::NodeError;

/// Error taxonomy for the sync engine and its agents (§4.5).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A `STREAM_REQUEST`/`STREAM_DATA`/`STREAM_END` named an agent id no
    /// [`crate::agent::Agent`] was ever registered under.
    #[error("no agent registered for id {0}")]
    UnknownAgent(u32),

    /// An agent's `metainf` was missing a field it requires.
    #[error("metainf is missing required field {0:?}")]
    MissingMetaField(&'static str),

    /// The remote side never replied to a `STREAM_REQUEST` within budget.
    #[error("timed out waiting for a stream reply")]
    Timeout,

    /// The remote stream factory rejected the request (e.g. already pending).
    #[error(transparent)]
    Stream(#[from] fsyncd_streams::StreamError),

    /// The wire protocol layer rejected a message.
    #[error(transparent)]
    Protocol(#[from] fsyncd_protocol::ProtocolError),

    /// Underlying I/O failure reading a source or writing a target.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Delta calculation or application failed.
    #[error(transparent)]
    Delta(#[from] fsyncd_delta::DeltaError),

    /// Signature calculation or loading failed.
    #[error(transparent)]
    Signature(#[from] fsyncd_signature::SignatureError),

    /// A storage lookup failed while an agent assembled its source or target.
    #[error(transparent)]
    Storage(#[from] fsyncd_storage::StorageError),
}

impl From<SyncError> for NodeError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Io(e) => NodeError::Io(e),
            SyncError::Timeout => NodeError::Timeout,
            SyncError::Stream(e) => e.into(),
            SyncError::Storage(e) => e.into(),
            SyncError::UnknownAgent(_)
            | SyncError::MissingMetaField(_)
            | SyncError::Protocol(_)
            | SyncError::Delta(_)
            | SyncError::Signature(_) => NodeError::Protocol(err.to_string()),
        }
    }
}

/// Convenience alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
