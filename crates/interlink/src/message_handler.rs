use async_trait::async_trait;
use fsyncd_core::PeerId;
use fsyncd_protocol::Message;

/// Receives every message a bound session's reader task decodes, tagged
/// with the peer it arrived from.
///
/// Kept as a small dyn-safe trait rather than routing decoded messages
/// through [`fsyncd_bus::Bus`]: the sync engine and remote stream factory
/// both need the typed [`Message`] itself, not a re-encoded payload, so the
/// `node` crate wires this straight to whichever of them owns the topic the
/// message carries.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one decoded message from `from`.
    async fn handle(&self, from: PeerId, message: Message);
}
