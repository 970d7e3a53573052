//! Wire message types (§6.1).

use bytes::Bytes;
use fsyncd_core::PeerId;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::metainf::MetaInf;

/// Current (and only) protocol version this node speaks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Upper bound on a single `STREAM_DATA` chunk, matching the fixed 64 KiB
/// chunking the remote stream factory uses (§4.4).
pub const MAX_CHUNK_BYTES: u32 = 64 * 1024;

const TYPE_HELLO: u32 = 0;
const TYPE_NODE_STATUS: u32 = 1;
const TYPE_STREAM_REQUEST: u32 = 2;
const TYPE_STREAM: u32 = 3;
const TYPE_STREAM_DATA: u32 = 4;
const TYPE_STREAM_END: u32 = 5;

/// A single framed protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Initial handshake: announces identity and protocol version.
    Hello {
        /// Sender's peer id.
        peer_id: PeerId,
        /// Sender's protocol version.
        version: u32,
    },
    /// Broadcasts readiness-for-sync and other peer status bits.
    NodeStatus {
        /// Sender's peer id.
        peer_id: PeerId,
        /// Status bitset.
        status_bits: u32,
    },
    /// Requests a new stream between `src` and `dst`.
    StreamRequest {
        /// Requesting endpoint.
        src: PeerId,
        /// Target endpoint.
        dst: PeerId,
        /// Caller-chosen correlation token for matching the eventual `STREAM` reply.
        cookie: u32,
        /// Self-describing stream metadata (e.g. file path, size).
        metainf: MetaInf,
    },
    /// Grants a `StreamRequest`, assigning it a concrete stream id.
    Stream {
        /// Requesting endpoint.
        src: PeerId,
        /// Target endpoint.
        dst: PeerId,
        /// Newly assigned stream id.
        stream_id: u32,
        /// Correlation token from the originating `StreamRequest`.
        cookie: u32,
    },
    /// One chunk of stream payload.
    StreamData {
        /// Sending endpoint.
        src: PeerId,
        /// Receiving endpoint.
        dst: PeerId,
        /// Target stream id.
        stream_id: u32,
        /// Byte offset of `data` within the stream.
        offset: u64,
        /// Chunk payload, at most [`MAX_CHUNK_BYTES`].
        data: Bytes,
    },
    /// Terminates a stream.
    StreamEnd {
        /// Sending endpoint.
        src: PeerId,
        /// Receiving endpoint.
        dst: PeerId,
        /// Stream being closed.
        stream_id: u32,
        /// Completion status (0 = OK; nonzero values are protocol-specific error codes).
        status: u32,
    },
}

impl Message {
    /// Asynchronously writes this message, length-prefixed at the frame
    /// level by its own fixed and explicit-size fields — no outer envelope
    /// is needed since every variable-length field carries its own size.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, w: &mut W) -> Result<()> {
        match self {
            Message::Hello { peer_id, version } => {
                w.write_u32(TYPE_HELLO).await?;
                w.write_all(peer_id.as_bytes()).await?;
                w.write_u32(*version).await?;
            }
            Message::NodeStatus { peer_id, status_bits } => {
                w.write_u32(TYPE_NODE_STATUS).await?;
                w.write_all(peer_id.as_bytes()).await?;
                w.write_u32(*status_bits).await?;
            }
            Message::StreamRequest { src, dst, cookie, metainf } => {
                w.write_u32(TYPE_STREAM_REQUEST).await?;
                w.write_all(src.as_bytes()).await?;
                w.write_all(dst.as_bytes()).await?;
                w.write_u32(*cookie).await?;
                let encoded = metainf.encode();
                w.write_u32(encoded.len() as u32).await?;
                w.write_all(&encoded).await?;
            }
            Message::Stream { src, dst, stream_id, cookie } => {
                w.write_u32(TYPE_STREAM).await?;
                w.write_all(src.as_bytes()).await?;
                w.write_all(dst.as_bytes()).await?;
                w.write_u32(*stream_id).await?;
                w.write_u32(*cookie).await?;
            }
            Message::StreamData { src, dst, stream_id, offset, data } => {
                if data.len() as u64 > u64::from(MAX_CHUNK_BYTES) {
                    return Err(ProtocolError::FieldTooLarge(data.len()));
                }
                w.write_u32(TYPE_STREAM_DATA).await?;
                w.write_all(src.as_bytes()).await?;
                w.write_all(dst.as_bytes()).await?;
                w.write_u32(*stream_id).await?;
                w.write_u64(*offset).await?;
                w.write_u32(data.len() as u32).await?;
                w.write_all(data).await?;
            }
            Message::StreamEnd { src, dst, stream_id, status } => {
                w.write_u32(TYPE_STREAM_END).await?;
                w.write_all(src.as_bytes()).await?;
                w.write_all(dst.as_bytes()).await?;
                w.write_u32(*stream_id).await?;
                w.write_u32(*status).await?;
            }
        }
        Ok(())
    }

    /// Asynchronously reads one message, dispatching on its leading `msg_type`.
    pub async fn read_from<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self> {
        let msg_type = r.read_u32().await?;
        match msg_type {
            TYPE_HELLO => Ok(Message::Hello {
                peer_id: read_peer_id(r).await?,
                version: r.read_u32().await?,
            }),
            TYPE_NODE_STATUS => Ok(Message::NodeStatus {
                peer_id: read_peer_id(r).await?,
                status_bits: r.read_u32().await?,
            }),
            TYPE_STREAM_REQUEST => {
                let src = read_peer_id(r).await?;
                let dst = read_peer_id(r).await?;
                let cookie = r.read_u32().await?;
                let len = r.read_u32().await? as usize;
                let mut buf = vec![0u8; len];
                r.read_exact(&mut buf).await?;
                let metainf = MetaInf::decode(&buf)?;
                Ok(Message::StreamRequest { src, dst, cookie, metainf })
            }
            TYPE_STREAM => Ok(Message::Stream {
                src: read_peer_id(r).await?,
                dst: read_peer_id(r).await?,
                stream_id: r.read_u32().await?,
                cookie: r.read_u32().await?,
            }),
            TYPE_STREAM_DATA => {
                let src = read_peer_id(r).await?;
                let dst = read_peer_id(r).await?;
                let stream_id = r.read_u32().await?;
                let offset = r.read_u64().await?;
                let size = r.read_u32().await?;
                if size > MAX_CHUNK_BYTES {
                    return Err(ProtocolError::FieldTooLarge(size as usize));
                }
                let mut data = vec![0u8; size as usize];
                r.read_exact(&mut data).await?;
                Ok(Message::StreamData { src, dst, stream_id, offset, data: Bytes::from(data) })
            }
            TYPE_STREAM_END => Ok(Message::StreamEnd {
                src: read_peer_id(r).await?,
                dst: read_peer_id(r).await?,
                stream_id: r.read_u32().await?,
                status: r.read_u32().await?,
            }),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

async fn read_peer_id<R: AsyncRead + Unpin>(r: &mut R) -> Result<PeerId> {
    let mut bytes = [0u8; 16];
    r.read_exact(&mut bytes).await?;
    Ok(PeerId::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn round_trip(msg: Message) {
        let mut buf = Vec::new();
        msg.write_to(&mut buf).await.unwrap();
        let decoded = Message::read_from(&mut buf.as_slice()).await.unwrap();
        assert_eq!(msg, decoded);
    }

    #[tokio::test]
    async fn round_trips_every_variant() {
        let src = PeerId::generate();
        let dst = PeerId::generate();

        round_trip(Message::Hello { peer_id: src, version: PROTOCOL_VERSION }).await;
        round_trip(Message::NodeStatus { peer_id: src, status_bits: 1 }).await;
        round_trip(Message::StreamRequest {
            src,
            dst,
            cookie: 42,
            metainf: MetaInf::new(),
        })
        .await;
        round_trip(Message::Stream { src, dst, stream_id: 7, cookie: 42 }).await;
        round_trip(Message::StreamData {
            src,
            dst,
            stream_id: 7,
            offset: 0,
            data: Bytes::from_static(b"hello"),
        })
        .await;
        round_trip(Message::StreamEnd { src, dst, stream_id: 7, status: 0 }).await;
    }

    #[tokio::test]
    async fn rejects_oversized_stream_data_chunk() {
        let src = PeerId::generate();
        let dst = PeerId::generate();
        let oversized = Message::StreamData {
            src,
            dst,
            stream_id: 1,
            offset: 0,
            data: Bytes::from(vec![0u8; MAX_CHUNK_BYTES as usize + 1]),
        };
        let mut buf = Vec::new();
        assert!(oversized.write_to(&mut buf).await.is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_message_type() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&99u32.to_be_bytes());
        let result = Message::read_from(&mut buf.as_slice()).await;
        assert!(matches!(result, Err(ProtocolError::UnknownMessageType(99))));
    }
}
