use fsyncd_core::NodeError;

/// Error taxonomy for signature calculation and loading (§4.6.1-4.6.2).
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Underlying I/O failure reading the base or signature stream.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The signature wire format was truncated or internally inconsistent.
    #[error("corrupt signature: {0}")]
    Corrupt(String),

    /// An operation that requires a loaded signature was attempted before
    /// [`crate::signature::Signature::load`] completed.
    #[error("signature not yet loaded")]
    NotLoaded,
}

impl From<SignatureError> for NodeError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Io(e) => NodeError::Io(e),
            SignatureError::Corrupt(msg) => NodeError::Protocol(msg),
            SignatureError::NotLoaded => NodeError::InvalidTx,
        }
    }
}

/// Convenience alias for signature operations.
pub type Result<T> = std::result::Result<T, SignatureError>;
