use fsyncd_core::NodeError;

/// Error taxonomy for the interlink connection manager (§4.3).
#[derive(Debug, thiserror::Error)]
pub enum InterlinkError {
    /// Underlying transport I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire decoding failure during handshake or message dispatch.
    #[error(transparent)]
    Protocol(#[from] fsyncd_protocol::ProtocolError),

    /// The handshake did not complete within the configured timeout.
    #[error("handshake timed out")]
    Timeout,

    /// The remote advertised a protocol version we do not speak.
    #[error("protocol version mismatch")]
    VersionMismatch,

    /// The remote's handshake `peer_id` equals our own.
    #[error("self-connect rejected")]
    SelfConnect,

    /// The first message on a fresh connection was not `HELLO`.
    #[error("expected HELLO as first message")]
    ExpectedHello,

    /// The configured [`crate::PeerAuthenticator`] rejected this peer.
    #[error("peer rejected by authenticator")]
    Unauthenticated,
}

impl From<InterlinkError> for NodeError {
    fn from(err: InterlinkError) -> Self {
        match err {
            InterlinkError::Io(e) => NodeError::Io(e),
            InterlinkError::Timeout => NodeError::Timeout,
            InterlinkError::Protocol(e) => e.into(),
            InterlinkError::VersionMismatch
            | InterlinkError::SelfConnect
            | InterlinkError::ExpectedHello
            | InterlinkError::Unauthenticated => NodeError::Protocol(err.to_string()),
        }
    }
}

/// Convenience alias for interlink operations.
pub type Result<T> = std::result::Result<T, InterlinkError>;
