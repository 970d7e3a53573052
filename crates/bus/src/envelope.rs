use bytes::Bytes;
use fsyncd_core::PeerId;

/// A published message: a topic-addressed, source/destination-tagged payload.
///
/// Mirrors `fmsg_t` — every message carries its own source and destination
/// peer so that handlers which care about provenance don't need a second
/// lookup.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Topic this message was published on.
    pub topic: u32,
    /// Originating peer (the local node for locally generated events).
    pub src: PeerId,
    /// Intended recipient peer, or the local node's own id for local-only events.
    pub dst: PeerId,
    /// Opaque message payload.
    pub payload: Bytes,
}

impl Envelope {
    /// Builds a new envelope.
    #[must_use]
    pub fn new(topic: u32, src: PeerId, dst: PeerId, payload: impl Into<Bytes>) -> Self {
        Self { topic, src, dst, payload: payload.into() }
    }
}
