//! Decouples the sync engine from a concrete `fsyncd_interlink::Interlink<T>`
//! transport, the same way `interlink` itself decouples from a concrete
//! transport via its `Transport` trait.

use async_trait::async_trait;

use fsyncd_core::PeerId;
use fsyncd_protocol::Message;

/// Sends one wire message to `dst`. Implemented by the `node` crate as a
/// thin wrapper over an `Interlink<T>` session lookup.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends `message` to `dst`, failing if no session is open.
    async fn send(&self, dst: PeerId, message: Message) -> std::io::Result<()>;
}
