use fsyncd_core::PeerId;
use tokio::io::{AsyncRead, AsyncWrite};

/// An opaque, reliable, bidirectional byte channel with an already-bound
/// peer authentication layer.
///
/// This abstracts over whatever the out-of-scope TCP/TLS transport layer
/// provides (`original_source/fnet/src/tcp_transport.c` /
/// `ssl_transport.c`): interlink only needs a duplex byte stream and,
/// optionally, an identity the transport layer has already authenticated
/// (e.g. from a TLS client certificate). The `HELLO` handshake (§4.3) is
/// the authoritative identity exchange regardless of whether
/// `peer_identity` returns anything.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {
    /// The peer identity bound by the transport layer itself, if any.
    fn peer_identity(&self) -> Option<PeerId> {
        None
    }
}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}
