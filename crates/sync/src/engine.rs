//! Sync engine (§4.5): drives a stream end-to-end on behalf of whichever
//! [`Agent`] a `STREAM_REQUEST` names, on both the sending and receiving
//! side of a sync.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;

use fsyncd_core::PeerId;
use fsyncd_protocol::{Message, MetaInf, MetaValue};
use fsyncd_streams::RemoteStreamFactory;

use crate::agent::Agent;
use crate::error::{Result, SyncError};
use crate::io_adapter::{IStream, MemIStream, OStream};
use crate::message_sender::MessageSender;

/// Reserved `metainf` key a `STREAM_REQUEST` carries its target agent id
/// under, since the wire message itself has no dedicated `agent_id` field.
pub const METAINF_AGENT_ID_KEY: &str = "agent_id";

/// Bound on how long [`SyncEngine::sync`] waits for the remote `STREAM` reply.
pub const DEFAULT_STREAM_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

type PendingKey = (PeerId, PeerId, u32);

/// Owns the agent registry and drives both the sender-side `sync` flow and
/// the receiver-side response to an inbound `STREAM_REQUEST`.
pub struct SyncEngine {
    local_peer_id: PeerId,
    agents: DashMap<u32, Arc<dyn Agent>>,
    factory: Arc<RemoteStreamFactory>,
    sender: Arc<dyn MessageSender>,
    pending_replies: DashMap<PendingKey, oneshot::Sender<u32>>,
    next_cookie: AtomicU32,
    stream_reply_timeout: Duration,
}

impl SyncEngine {
    /// Builds an engine over an already-running stream factory and a
    /// message sender that reaches peers over whatever transport the
    /// caller's interlink is concretely parameterized with.
    #[must_use]
    pub fn new(local_peer_id: PeerId, factory: Arc<RemoteStreamFactory>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            local_peer_id,
            agents: DashMap::new(),
            factory,
            sender,
            pending_replies: DashMap::new(),
            next_cookie: AtomicU32::new(1),
            stream_reply_timeout: DEFAULT_STREAM_REPLY_TIMEOUT,
        }
    }

    /// Registers `agent` under [`Agent::id`]. Idempotent: registering the
    /// same id again is a no-op, matching `register_agent`'s contract
    /// (§4.5 Operations).
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        self.agents.entry(agent.id()).or_insert(agent);
    }

    /// Obtains `agent_id`'s source bytes via [`Agent::source`] and streams
    /// them to `dst` via [`Self::sync`]. The convenience path for a sender
    /// that doesn't already have a pre-opened `source_istream`.
    pub async fn push(&self, dst: PeerId, agent_id: u32, metainf: MetaInf) -> Result<()> {
        let agent = self.agent(agent_id)?;
        let source = agent.source(&metainf).await?;
        self.sync(dst, agent_id, metainf, source).await
    }

    /// Sender-side flow (§4.5 Operations):
    /// 1. Compose `STREAM_REQUEST` carrying `{agent_id, metainf, cookie}`.
    /// 2. On the `STREAM` reply, pump `source → wire` in fixed-size chunks.
    /// 3. On EOF, publish `STREAM_END{OK}`; on error, `STREAM_END{ERR}`.
    pub async fn sync(
        &self,
        dst: PeerId,
        agent_id: u32,
        mut metainf: MetaInf,
        mut source: Box<dyn IStream>,
    ) -> Result<()> {
        let cookie = self.next_cookie.fetch_add(1, Ordering::Relaxed);
        let key = (self.local_peer_id, dst, cookie);

        self.factory.request(self.local_peer_id, dst, cookie).await?;

        metainf.insert(METAINF_AGENT_ID_KEY, MetaValue::U32(agent_id));

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending_replies.insert(key, reply_tx);

        let sent = self
            .sender
            .send(dst, Message::StreamRequest { src: self.local_peer_id, dst, cookie, metainf: metainf.clone() })
            .await;
        if let Err(err) = sent {
            self.pending_replies.remove(&key);
            self.factory.complete_request(self.local_peer_id, dst, cookie).await;
            return Err(SyncError::Io(err));
        }

        let stream_id = match tokio::time::timeout(self.stream_reply_timeout, reply_rx).await {
            Ok(Ok(stream_id)) => stream_id,
            _ => {
                self.pending_replies.remove(&key);
                self.factory.complete_request(self.local_peer_id, dst, cookie).await;
                return Err(SyncError::Timeout);
            }
        };
        self.factory.complete_request(self.local_peer_id, dst, cookie).await;

        let result = self.pump_to_wire(dst, stream_id, source.as_mut()).await;
        self.finish_sync(dst, stream_id, &metainf, agent_id, result).await
    }

    async fn pump_to_wire(&self, dst: PeerId, stream_id: u32, source: &mut dyn IStream) -> Result<()> {
        let mut offset = 0u64;
        let mut buf = vec![0u8; fsyncd_protocol::MAX_CHUNK_BYTES as usize];
        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            let data = bytes::Bytes::copy_from_slice(&buf[..n]);
            self.sender
                .send(dst, Message::StreamData { src: self.local_peer_id, dst, stream_id, offset, data })
                .await?;
            offset += n as u64;
        }
    }

    async fn finish_sync(
        &self,
        dst: PeerId,
        stream_id: u32,
        metainf: &MetaInf,
        agent_id: u32,
        result: Result<()>,
    ) -> Result<()> {
        let status = u32::from(result.is_err());
        let _ = self
            .sender
            .send(dst, Message::StreamEnd { src: self.local_peer_id, dst, stream_id, status })
            .await;

        let Some(agent) = self.agents.get(&agent_id).map(|entry| Arc::clone(entry.value())) else {
            return result;
        };
        match &result {
            Ok(()) => agent.complete(metainf).await,
            Err(err) => agent.failed(metainf, err, &err.to_string()).await,
        }
        result
    }

    /// Receiver-side flow: decode an inbound wire message and dispatch it
    /// to the agent registry or the remote stream factory, whichever
    /// applies.
    pub async fn handle_message(self: &Arc<Self>, message: Message) -> Result<()> {
        match message {
            Message::Stream { src, dst, stream_id, cookie } => {
                if let Some((_, reply_tx)) = self.pending_replies.remove(&(src, dst, cookie)) {
                    let _ = reply_tx.send(stream_id);
                }
                Ok(())
            }
            Message::StreamRequest { src, dst: _, cookie, metainf } => self.accept_request(src, cookie, metainf).await,
            Message::StreamData { .. } | Message::StreamEnd { .. } => Ok(self.factory.deliver_message(message).await?),
            Message::Hello { .. } | Message::NodeStatus { .. } => Ok(()),
        }
    }

    async fn accept_request(self: &Arc<Self>, src: PeerId, cookie: u32, metainf: MetaInf) -> Result<()> {
        let agent_id = match metainf.get(METAINF_AGENT_ID_KEY) {
            Some(MetaValue::U32(id)) => *id,
            _ => return Err(SyncError::UnknownAgent(0)),
        };
        let agent = self.agent(agent_id)?;
        let (base, target) = agent.accept(&metainf).await?;
        let (stream_id, reader) = self.factory.accept().await;

        self.sender
            .send(src, Message::Stream { src, dst: self.local_peer_id, stream_id, cookie })
            .await?;

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_receive_pump(reader, base, target, metainf, agent, agent_id).await;
        });
        Ok(())
    }

    async fn run_receive_pump(
        &self,
        reader: fsyncd_streams::MemIoReader,
        base: Box<dyn IStream>,
        mut target: Box<dyn OStream>,
        metainf: MetaInf,
        agent: Arc<dyn Agent>,
        _agent_id: u32,
    ) {
        // `base` stays alive for the pump's duration in case `target`
        // borrowed nothing from it at `accept` time and instead expects it
        // to still be open (e.g. a delta sink re-reading the base lazily).
        let _base = base;
        let mut source = MemIStream(reader);
        let mut buf = vec![0u8; fsyncd_streams::DEFAULT_BLOCK_SIZE];
        let result = async {
            loop {
                let n = source.read(&mut buf).await.map_err(SyncError::Io)?;
                if n == 0 {
                    target.finish().await.map_err(SyncError::Io)?;
                    return Ok(());
                }
                target.write(&buf[..n]).await.map_err(SyncError::Io)?;
            }
        }
        .await;

        match &result {
            Ok(()) => agent.complete(&metainf).await,
            Err(err) => agent.failed(&metainf, err, &err.to_string()).await,
        }
    }

    fn agent(&self, agent_id: u32) -> Result<Arc<dyn Agent>> {
        self.agents
            .get(&agent_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SyncError::UnknownAgent(agent_id))
    }
}

