use std::sync::Arc;

use crate::bus::ControlMsg;

/// RAII handle returned by [`crate::Bus::subscribe`].
///
/// Dropping it sends an unsubscribe request to the bus's control thread and
/// blocks until that thread confirms every in-flight dispatch to this
/// subscriber has quiesced — the same guarantee `fmsgbus_unsubscribe` gives
/// its caller.
pub struct SubscriptionHandle {
    pub(crate) topic: u32,
    pub(crate) id: u64,
    pub(crate) control_tx: crossbeam_channel::Sender<ControlMsg>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let sent = self.control_tx.send(ControlMsg::Unsubscribe {
            topic: self.topic,
            id: self.id,
            reply: reply_tx,
        });
        if sent.is_ok() {
            // The control thread may already be gone if the bus was dropped
            // first; a closed channel here just means there is nothing left
            // to quiesce against.
            let _ = reply_rx.recv();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) handler: Arc<dyn Fn(&crate::envelope::Envelope) + Send + Sync>,
}
