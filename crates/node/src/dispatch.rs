use async_trait::async_trait;
use std::sync::Arc;

use fsyncd_core::PeerId;
use fsyncd_interlink::MessageHandler;
use fsyncd_protocol::Message;
use fsyncd_sync::SyncEngine;

/// Forwards every message a bound session decodes to the sync engine, which
/// itself routes `STREAM_DATA`/`STREAM_END` on into the remote stream
/// factory (§4.4, §4.5).
pub struct EngineDispatch {
    engine: Arc<SyncEngine>,
}

impl EngineDispatch {
    /// Wraps `engine`.
    #[must_use]
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl MessageHandler for EngineDispatch {
    async fn handle(&self, from: PeerId, message: Message) {
        if let Err(err) = self.engine.handle_message(message).await {
            tracing::warn!(peer = %from, %err, "failed to dispatch inbound message");
        }
    }
}
