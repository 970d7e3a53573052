use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use dashmap::DashMap;

use crate::envelope::Envelope;
use crate::error::{BusError, Result};
use crate::subscription::{Subscriber, SubscriptionHandle};

/// Default worker thread count (§4.2 Scheduling).
pub const DEFAULT_WORKERS: usize = 8;

/// Per-worker bounded queue capacity. The original's "~1 MiB ring buffer"
/// default is expressed here as a message count rather than a byte budget,
/// since `Envelope` payloads are heap-allocated and of unknown size up front.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

pub(crate) enum ControlMsg {
    Subscribe {
        topic: u32,
        id: u64,
        handler: Arc<dyn Fn(&Envelope) + Send + Sync>,
        reply: Sender<()>,
    },
    Unsubscribe {
        topic: u32,
        id: u64,
        reply: Sender<()>,
    },
    Shutdown,
}

/// Process-local, topic-addressed publish/subscribe bus (§4.2).
///
/// Messages for a given `(topic, src)` pair are always routed to the same
/// worker thread, which gives FIFO delivery per publisher and topic for
/// free without a per-topic lock on the hot publish path — the original's
/// "N workers dequeue from one FIFO" becomes N sharded FIFOs keyed by
/// `(topic, src)`, preserving the same per-publisher ordering guarantee
/// (§8 property 7) with none of the contention a single shared queue would
/// force onto every publish.
pub struct Bus {
    queues: Vec<Sender<Envelope>>,
    control_tx: Sender<ControlMsg>,
    control_handle: Option<JoinHandle<()>>,
    worker_handles: Vec<JoinHandle<()>>,
    next_id: AtomicU64,
    inactive: Arc<AtomicBool>,
}

impl Bus {
    /// Starts a bus with the default worker count and queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WORKERS, DEFAULT_QUEUE_CAPACITY)
    }

    /// Starts a bus with `worker_count` workers, each with a bounded queue
    /// of `queue_capacity` envelopes.
    #[must_use]
    pub fn with_capacity(worker_count: usize, queue_capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let subscribers: Arc<DashMap<u32, Vec<Arc<Subscriber>>>> = Arc::new(DashMap::new());
        let inactive = Arc::new(AtomicBool::new(false));

        let mut queues = Vec::with_capacity(worker_count);
        let mut worker_handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, rx) = crossbeam_channel::bounded(queue_capacity);
            queues.push(tx);
            let subs = Arc::clone(&subscribers);
            worker_handles.push(std::thread::spawn(move || worker_loop(rx, subs)));
        }

        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let control_handle = std::thread::spawn(move || control_loop(control_rx, subscribers));

        Self {
            queues,
            control_tx,
            control_handle: Some(control_handle),
            worker_handles,
            next_id: AtomicU64::new(0),
            inactive,
        }
    }

    /// Publishes `envelope`. Returns [`BusError::QueueFull`] if the target
    /// worker's queue has no room; the caller decides whether to retry or
    /// drop per its own policy.
    pub fn publish(&self, envelope: Envelope) -> Result<()> {
        if self.inactive.load(Ordering::Acquire) {
            return Err(BusError::ShutDown);
        }
        let idx = worker_index(envelope.topic, envelope.src.as_bytes(), self.queues.len());
        self.queues[idx].try_send(envelope).map_err(|e| match e {
            TrySendError::Full(_) => BusError::QueueFull,
            TrySendError::Disconnected(_) => BusError::ShutDown,
        })
    }

    /// Registers `handler` for `topic`. The request is processed by the
    /// dedicated control thread, which this call blocks on.
    pub fn subscribe<F>(&self, topic: u32, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let _ = self.control_tx.send(ControlMsg::Subscribe {
            topic,
            id,
            handler: Arc::new(handler),
            reply: reply_tx,
        });
        let _ = reply_rx.recv();
        SubscriptionHandle { topic, id, control_tx: self.control_tx.clone() }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        self.inactive.store(true, Ordering::Release);
        // Dropping every queue sender disconnects the paired receivers,
        // which ends each worker's `for envelope in rx.iter()` loop once it
        // has drained whatever was already enqueued.
        self.queues.clear();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
        let _ = self.control_tx.send(ControlMsg::Shutdown);
        if let Some(handle) = self.control_handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_index(topic: u32, src: &[u8; 16], worker_count: usize) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    topic.hash(&mut hasher);
    src.hash(&mut hasher);
    (hasher.finish() as usize) % worker_count
}

fn worker_loop(rx: Receiver<Envelope>, subscribers: Arc<DashMap<u32, Vec<Arc<Subscriber>>>>) {
    for envelope in rx.iter() {
        let snapshot = subscribers.get(&envelope.topic).map(|entry| entry.value().clone());
        let Some(subs) = snapshot else { continue };
        for sub in subs {
            (sub.handler)(&envelope);
        }
    }
}

fn control_loop(rx: Receiver<ControlMsg>, subscribers: Arc<DashMap<u32, Vec<Arc<Subscriber>>>>) {
    for msg in rx.iter() {
        match msg {
            ControlMsg::Subscribe { topic, id, handler, reply } => {
                subscribers.entry(topic).or_default().push(Arc::new(Subscriber { id, handler }));
                let _ = reply.send(());
            }
            ControlMsg::Unsubscribe { topic, id, reply } => {
                let removed = subscribers.get_mut(&topic).and_then(|mut subs| {
                    let pos = subs.iter().position(|s| s.id == id)?;
                    Some(subs.remove(pos))
                });
                // Wait for every worker holding a snapshot Arc to finish
                // dispatching to this subscriber before acking — the
                // "unsubscribe quiesces in-flight handlers" guarantee.
                if let Some(entry) = removed {
                    while Arc::strong_count(&entry) > 1 {
                        std::thread::sleep(std::time::Duration::from_micros(100));
                    }
                }
                let _ = reply.send(());
            }
            ControlMsg::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsyncd_core::PeerId;
    use std::sync::Mutex;

    #[test]
    fn subscriber_observes_published_order() {
        let bus = Bus::with_capacity(4, 16);
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let _handle = bus.subscribe(7, move |env: &Envelope| {
            received_clone.lock().unwrap().push(env.payload.clone());
        });

        let src = PeerId::generate();
        let dst = PeerId::generate();
        for i in 0u8..20 {
            bus.publish(Envelope::new(7, src, dst, vec![i])).unwrap();
        }

        // Same (topic, src) always lands on the same worker, so draining is
        // synchronous enough for a short spin-wait in a unit test.
        for _ in 0..200 {
            if received.lock().unwrap().len() == 20 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        let got = received.lock().unwrap().clone();
        let expected: Vec<bytes::Bytes> = (0u8..20).map(|i| bytes::Bytes::from(vec![i])).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn publish_rejects_when_queue_full() {
        let bus = Bus::with_capacity(1, 1);
        let _handle = bus.subscribe(1, |_: &Envelope| {
            std::thread::sleep(std::time::Duration::from_millis(50));
        });
        let src = PeerId::generate();
        let dst = PeerId::generate();
        bus.publish(Envelope::new(1, src, dst, vec![0])).unwrap();
        bus.publish(Envelope::new(1, src, dst, vec![1])).unwrap();
        let third = bus.publish(Envelope::new(1, src, dst, vec![2]));
        assert!(matches!(third, Err(BusError::QueueFull)));
    }

    #[test]
    fn unsubscribe_blocks_until_in_flight_handler_completes() {
        let bus = Bus::with_capacity(1, 8);
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        let handle = bus.subscribe(3, move |_: &Envelope| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            ran_clone.store(true, Ordering::SeqCst);
        });
        let src = PeerId::generate();
        let dst = PeerId::generate();
        bus.publish(Envelope::new(3, src, dst, vec![0])).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        drop(handle);
        assert!(ran.load(Ordering::SeqCst));
    }
}
