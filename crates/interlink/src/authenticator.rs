use async_trait::async_trait;
use fsyncd_core::PeerId;

/// Authorizes a remote peer once its `HELLO` identity is known, before its
/// session is retained.
///
/// Certificate/trust-store verification is an out-of-scope external
/// collaborator (§1, §6.3): this crate only defines the seam an
/// implementation plugs into. [`Interlink`](crate::Interlink) without a
/// configured authenticator accepts every peer that completes the
/// handshake, matching its behavior before this trait existed.
#[async_trait]
pub trait PeerAuthenticator: Send + Sync {
    /// Returns whether `peer_id` (the identity the `HELLO` handshake
    /// reported) may retain a session, given whatever identity the
    /// transport layer itself already bound (e.g. a TLS client certificate).
    async fn authenticate(&self, peer_id: PeerId, transport_identity: Option<PeerId>) -> bool;
}
