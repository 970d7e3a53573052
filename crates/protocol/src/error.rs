use fsyncd_core::NodeError;

/// Error taxonomy for wire encoding/decoding (§6.1).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The stream ended or faulted while reading/writing a message.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// `msg_type` did not match any known variant.
    #[error("unknown message type: {0}")]
    UnknownMessageType(u32),

    /// A `metainf` tag byte did not match any known value kind.
    #[error("unknown metainf tag: {0}")]
    UnknownMetaTag(u8),

    /// A length-prefixed field declared a size larger than this node accepts.
    #[error("field too large: {0} bytes")]
    FieldTooLarge(usize),

    /// The handshake's advertised protocol version isn't supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u32),
}

impl From<ProtocolError> for NodeError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => NodeError::Io(e),
            other => NodeError::Protocol(other.to_string()),
        }
    }
}

/// Convenience alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
