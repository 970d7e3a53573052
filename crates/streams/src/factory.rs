//! Remote stream factory: state machine, ordering, and backpressure for
//! streams multiplexed over the bus (§4.4.2–§4.4.4).
//!
//! Byte delivery does not flow through the [`fsyncd_bus::Bus`] itself —
//! `STREAM_DATA` chunks arrive as direct calls from whatever decodes wire
//! frames (the interlink reader task, once wired up in the node crate).
//! The factory only *publishes* lifecycle notifications on
//! [`fsyncd_core::topics::STREAM_DATA`] and
//! [`fsyncd_core::topics::STREAM_END`] so other local subscribers (metrics,
//! the sync engine's agents) can observe stream activity without holding a
//! reference to the factory itself.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fsyncd_bus::{Bus, Envelope};
use fsyncd_core::{topics, PeerId};
use fsyncd_protocol::Message;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Result, StreamError};
use crate::mem_io::{self, MemIoReader, MemIoWriter};

/// Default block size for a stream's [`mem_io`] pipe (§4.4.4 fixed chunking).
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Default number of buffered blocks, bounding a stream to 1 MiB of
/// unread data (§4.4.4 Backpressure).
pub const DEFAULT_MAX_BLOCKS: usize = 16;

/// Bound on how long out-of-order `STREAM_DATA` is held before the stream
/// is abandoned (§4.4.4 Ordering: "30 retries at 100ms").
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_millis(30 * 100);

type PendingKey = (PeerId, PeerId, u32);

enum Control {
    Request { key: PendingKey, reply: oneshot::Sender<Result<()>> },
    CompleteRequest { key: PendingKey },
    Accept { reply: oneshot::Sender<(u32, MemIoReader)> },
    Deliver { stream_id: u32, offset: u64, data: Bytes, reply: oneshot::Sender<Result<()>> },
    CheckStall { stream_id: u32, stalled_at: u64 },
    End { stream_id: u32, status: u32, reply: oneshot::Sender<()> },
    Shutdown,
}

struct StreamEntry {
    writer: MemIoWriter,
    written_size: u64,
    pending_chunks: BTreeMap<u64, Bytes>,
}

/// Owns the receiver-side state machine for every stream this node is a
/// party to: the at-most-one-pending-request table, the `stream_id`
/// allocator, and per-stream reassembly state.
///
/// All mutation is serialized through one actor task (§4.4.5 Control
/// thread) — the async translation of the same "single queue, one worker"
/// idiom the bus crate uses with a dedicated OS thread.
pub struct RemoteStreamFactory {
    control_tx: mpsc::UnboundedSender<Control>,
    handle: Option<JoinHandle<()>>,
}

impl RemoteStreamFactory {
    /// Starts a factory publishing lifecycle events onto `bus`.
    #[must_use]
    pub fn new(local_peer_id: PeerId, bus: Arc<Bus>) -> Self {
        Self::with_reconnect_wait(local_peer_id, bus, DEFAULT_RECONNECT_WAIT)
    }

    /// Starts a factory with a non-default reconnect-wait budget.
    #[must_use]
    pub fn with_reconnect_wait(local_peer_id: PeerId, bus: Arc<Bus>, reconnect_wait: Duration) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let actor_tx = control_tx.clone();
        let handle = tokio::spawn(run_actor(control_rx, actor_tx, local_peer_id, bus, reconnect_wait));
        Self { control_tx, handle: Some(handle) }
    }

    /// Registers a pending request for `(local, dst, cookie)`, rejecting a
    /// second concurrent request for the same key (§4.4.4 at-most-one-pending).
    pub async fn request(&self, local: PeerId, dst: PeerId, cookie: u32) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Control::Request { key: (local, dst, cookie), reply }).await;
        rx.await.map_err(|_| StreamError::Closed)?
    }

    /// Clears a pending request once its `STREAM` reply (or a rejection)
    /// has been observed.
    pub async fn complete_request(&self, local: PeerId, dst: PeerId, cookie: u32) {
        let _ = self.control_tx.send(Control::CompleteRequest { key: (local, dst, cookie) });
    }

    /// Accepts an inbound `STREAM_REQUEST`: allocates a stream id and a
    /// bounded pipe, returning the reader half to the caller (typically a
    /// sync agent) and retaining the writer half for [`Self::deliver_data`].
    pub async fn accept(&self) -> (u32, MemIoReader) {
        let (reply, rx) = oneshot::channel();
        self.send(Control::Accept { reply }).await;
        rx.await.expect("actor task outlives its handle")
    }

    /// Feeds one `STREAM_DATA` chunk into `stream_id`'s pipe. Chunks that
    /// arrive out of order are held until the gap closes or the reconnect
    /// wait expires, at which point the stream is abandoned with
    /// [`StreamError::Timeout`] (§4.4.4 Ordering).
    pub async fn deliver_data(&self, stream_id: u32, offset: u64, data: Bytes) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Control::Deliver { stream_id, offset, data, reply }).await;
        rx.await.map_err(|_| StreamError::Closed)?
    }

    /// Terminates `stream_id`; `status == 0` closes it normally, any other
    /// value closes it with [`crate::mem_io::StreamStatus::Err`].
    pub async fn end(&self, stream_id: u32, status: u32) {
        let (reply, rx) = oneshot::channel();
        self.send(Control::End { stream_id, status, reply }).await;
        let _ = rx.await;
    }

    /// Routes a decoded wire message straight into [`Self::deliver_data`] or
    /// [`Self::end`], whichever it carries. Any other variant is a no-op —
    /// the caller is expected to have already dispatched `Hello`,
    /// `NodeStatus`, and `StreamRequest`/`Stream` elsewhere.
    pub async fn deliver_message(&self, message: Message) -> Result<()> {
        match message {
            Message::StreamData { stream_id, offset, data, .. } => {
                self.deliver_data(stream_id, offset, data).await
            }
            Message::StreamEnd { stream_id, status, .. } => {
                self.end(stream_id, status).await;
                Ok(())
            }
            Message::Hello { .. }
            | Message::NodeStatus { .. }
            | Message::StreamRequest { .. }
            | Message::Stream { .. } => Ok(()),
        }
    }

    async fn send(&self, msg: Control) {
        let _ = self.control_tx.send(msg);
    }
}

impl Drop for RemoteStreamFactory {
    fn drop(&mut self) {
        let _ = self.control_tx.send(Control::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_actor(
    mut rx: mpsc::UnboundedReceiver<Control>,
    control_tx: mpsc::UnboundedSender<Control>,
    local_peer_id: PeerId,
    bus: Arc<Bus>,
    reconnect_wait: Duration,
) {
    let mut pending: HashSet<PendingKey> = HashSet::new();
    let mut streams: std::collections::HashMap<u32, StreamEntry> = std::collections::HashMap::new();
    let mut next_id: u32 = 1;

    while let Some(msg) = rx.recv().await {
        match msg {
            Control::Request { key, reply } => {
                let result = if pending.insert(key) { Ok(()) } else { Err(StreamError::AlreadyPending) };
                let _ = reply.send(result);
            }
            Control::CompleteRequest { key } => {
                pending.remove(&key);
            }
            Control::Accept { reply } => {
                let stream_id = next_id;
                next_id = next_id.wrapping_add(1).max(1);
                let (reader, writer) = mem_io::pair(DEFAULT_BLOCK_SIZE, DEFAULT_MAX_BLOCKS);
                streams.insert(
                    stream_id,
                    StreamEntry { writer, written_size: 0, pending_chunks: BTreeMap::new() },
                );
                let _ = reply.send((stream_id, reader));
            }
            Control::Deliver { stream_id, offset, data, reply } => {
                let Some(entry) = streams.get_mut(&stream_id) else {
                    let _ = reply.send(Err(StreamError::UnknownStream(stream_id)));
                    continue;
                };
                if offset < entry.written_size {
                    // Duplicate of already-delivered data (retransmit after a
                    // reconnect); harmless to drop.
                    let _ = reply.send(Ok(()));
                    continue;
                }
                if offset == entry.written_size {
                    let len = data.len() as u64;
                    if let Err(e) = entry.writer.write(&data).await {
                        let _ = reply.send(Err(e));
                        continue;
                    }
                    entry.written_size += len;
                    while let Some(next) = entry.pending_chunks.remove(&entry.written_size) {
                        let len = next.len() as u64;
                        if entry.writer.write(&next).await.is_err() {
                            break;
                        }
                        entry.written_size += len;
                    }
                    let _ = reply.send(Ok(()));
                } else {
                    entry.pending_chunks.insert(offset, data);
                    let stalled_at = entry.written_size;
                    let tx = control_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(reconnect_wait).await;
                        let _ = tx.send(Control::CheckStall { stream_id, stalled_at });
                    });
                    let _ = reply.send(Ok(()));
                }
            }
            Control::CheckStall { stream_id, stalled_at } => {
                if let Some(entry) = streams.get(&stream_id) {
                    if entry.written_size == stalled_at && !entry.pending_chunks.is_empty() {
                        if let Some(entry) = streams.remove(&stream_id) {
                            entry.writer.close_with_error().await;
                        }
                        let _ = bus.publish(Envelope::new(
                            topics::STREAM_END,
                            local_peer_id,
                            local_peer_id,
                            stream_id.to_be_bytes().to_vec(),
                        ));
                        tracing::warn!(stream_id, "stream timed out waiting for missing data");
                    }
                }
            }
            Control::End { stream_id, status, reply } => {
                if let Some(entry) = streams.remove(&stream_id) {
                    if status == 0 {
                        entry.writer.close().await;
                    } else {
                        entry.writer.close_with_error().await;
                    }
                    let _ = bus.publish(Envelope::new(
                        topics::STREAM_END,
                        local_peer_id,
                        local_peer_id,
                        stream_id.to_be_bytes().to_vec(),
                    ));
                }
                let _ = reply.send(());
            }
            Control::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_request_for_same_key_is_rejected() {
        let bus = Arc::new(Bus::with_capacity(2, 16));
        let factory = RemoteStreamFactory::new(PeerId::generate(), bus);
        let local = PeerId::generate();
        let dst = PeerId::generate();
        factory.request(local, dst, 7).await.unwrap();
        let second = factory.request(local, dst, 7).await;
        assert!(matches!(second, Err(StreamError::AlreadyPending)));
        factory.complete_request(local, dst, 7).await;
        factory.request(local, dst, 7).await.unwrap();
    }

    #[tokio::test]
    async fn delivers_in_order_data_immediately() {
        let bus = Arc::new(Bus::with_capacity(2, 16));
        let factory = RemoteStreamFactory::new(PeerId::generate(), bus);
        let (stream_id, reader) = factory.accept().await;
        factory.deliver_data(stream_id, 0, Bytes::from_static(b"hello ")).await.unwrap();
        factory.deliver_data(stream_id, 6, Bytes::from_static(b"world")).await.unwrap();
        factory.end(stream_id, 0).await;

        let mut collected = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"hello world");
    }

    #[tokio::test]
    async fn out_of_order_chunk_is_reordered_once_gap_closes() {
        let bus = Arc::new(Bus::with_capacity(2, 16));
        let factory = RemoteStreamFactory::new(PeerId::generate(), bus);
        let (stream_id, reader) = factory.accept().await;

        factory.deliver_data(stream_id, 6, Bytes::from_static(b"world")).await.unwrap();
        factory.deliver_data(stream_id, 0, Bytes::from_static(b"hello ")).await.unwrap();
        factory.end(stream_id, 0).await;

        let mut collected = Vec::new();
        let mut buf = [0u8; 16];
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_gap_times_out() {
        let bus = Arc::new(Bus::with_capacity(2, 16));
        let factory = RemoteStreamFactory::with_reconnect_wait(
            PeerId::generate(),
            bus,
            Duration::from_millis(50),
        );
        let (stream_id, reader) = factory.accept().await;
        factory.deliver_data(stream_id, 6, Bytes::from_static(b"world")).await.unwrap();

        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;

        let mut buf = [0u8; 8];
        let result = reader.read(&mut buf).await;
        assert!(matches!(result, Err(StreamError::Closed)));
    }

    #[tokio::test]
    async fn deliver_message_routes_stream_data_and_end() {
        let bus = Arc::new(Bus::with_capacity(2, 16));
        let factory = RemoteStreamFactory::new(PeerId::generate(), bus);
        let (stream_id, reader) = factory.accept().await;
        let src = PeerId::generate();
        let dst = PeerId::generate();

        factory
            .deliver_message(Message::StreamData {
                src,
                dst,
                stream_id,
                offset: 0,
                data: Bytes::from_static(b"hi"),
            })
            .await
            .unwrap();
        factory.deliver_message(Message::StreamEnd { src, dst, stream_id, status: 0 }).await.unwrap();

        let mut buf = [0u8; 8];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hi");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_stream_is_rejected() {
        let bus = Arc::new(Bus::with_capacity(2, 16));
        let factory = RemoteStreamFactory::new(PeerId::generate(), bus);
        let result = factory.deliver_data(999, 0, Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(StreamError::UnknownStream(999))));
    }
}
