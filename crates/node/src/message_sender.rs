use async_trait::async_trait;
use std::sync::Arc;

use fsyncd_core::PeerId;
use fsyncd_interlink::{Interlink, Transport};
use fsyncd_protocol::Message;
use fsyncd_sync::MessageSender;

/// Adapts [`Interlink`]'s per-peer [`fsyncd_interlink::Session`] lookup to
/// the [`MessageSender`] seam [`fsyncd_sync::SyncEngine`] sends through,
/// decoupling `sync` from any concrete transport (§4.5 Design).
pub struct InterlinkMessageSender<T: Transport + 'static> {
    interlink: Arc<Interlink<T>>,
}

impl<T: Transport + 'static> InterlinkMessageSender<T> {
    /// Wraps `interlink`.
    #[must_use]
    pub fn new(interlink: Arc<Interlink<T>>) -> Self {
        Self { interlink }
    }
}

#[async_trait]
impl<T: Transport + 'static> MessageSender for InterlinkMessageSender<T> {
    async fn send(&self, dst: PeerId, message: Message) -> std::io::Result<()> {
        let session = self
            .interlink
            .session(dst)
            .ok_or_else(|| std::io::Error::other(format!("no session bound for peer {}", dst.to_hex())))?;
        session.send(&message).await.map_err(|e| std::io::Error::other(e.to_string()))
    }
}
