//! Serves this node's local directory index to a requesting peer (§4.5
//! Supplemented agents), grounded in
//! `original_source/fsync/src/search_engine_sync_agent.c` — the original's
//! `accept` is a stub that always succeeds and never ingests; this agent is
//! send-only for the same reason, and `source` is where the real work is.

use async_trait::async_trait;

use fsyncd_core::PeerId;
use fsyncd_protocol::MetaInf;
use fsyncd_storage::files::Files;
use fsyncd_storage::Storage;

use crate::agent::Agent;
use crate::error::{Result, SyncError};
use crate::io_adapter::{BufferIStream, IStream, OStream};

/// Registered id for [`IndexAgent`].
pub const AGENT_ID: u32 = 1;

/// Dumps `path`, `digest`, and `size` for every file this node knows about
/// `peer`, as a flat sequence of `(u32 path_len, path, [u8; 32] digest, u64
/// size)` rows with no outer framing — the receiver reads until EOF.
pub struct IndexAgent {
    storage: Storage,
    peer: PeerId,
}

impl IndexAgent {
    /// Serves `storage`'s index of `peer`'s files.
    #[must_use]
    pub fn new(storage: Storage, peer: PeerId) -> Self {
        Self { storage, peer }
    }
}

#[async_trait]
impl Agent for IndexAgent {
    fn id(&self) -> u32 {
        AGENT_ID
    }

    async fn accept(&self, _metainf: &MetaInf) -> Result<(Box<dyn IStream>, Box<dyn OStream>)> {
        // The original's `fsearch_engine_sync_agent_accept` is a stub that
        // always returns `true` but never produces usable streams, since
        // the search-engine agent only ever pushes; it was never registered
        // as a receiver. This port rejects the receiving role outright
        // rather than imitate a stub that silently drops the bytes.
        Err(SyncError::UnknownAgent(AGENT_ID))
    }

    async fn source(&self, _metainf: &MetaInf) -> Result<Box<dyn IStream>> {
        let storage = self.storage.clone();
        let peer = self.peer;
        let encoded = tokio::task::spawn_blocking(move || encode_index(&storage, peer))
            .await
            .map_err(|e| SyncError::Io(std::io::Error::other(e.to_string())))??;
        Ok(Box::new(BufferIStream::new(encoded)))
    }

    async fn complete(&self, _metainf: &MetaInf) {
        tracing::debug!(peer = %self.peer, "index sync complete");
    }

    async fn failed(&self, _metainf: &MetaInf, _err: &SyncError, message: &str) {
        tracing::warn!(peer = %self.peer, message, "index sync failed");
    }
}

fn encode_index(storage: &Storage, peer: PeerId) -> Result<Vec<u8>> {
    let mut wtxn = storage.write_txn()?;
    let files = Files::open(storage.env(), &mut wtxn, peer)?;
    let mut buf = Vec::new();
    for (_, record) in files.iter(&wtxn)? {
        buf.extend_from_slice(&(record.path.len() as u32).to_be_bytes());
        buf.extend_from_slice(record.path.as_bytes());
        buf.extend_from_slice(&record.digest);
        buf.extend_from_slice(&record.size.to_be_bytes());
    }
    Storage::commit(wtxn)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsyncd_storage::files::{FileRecord, FileStatus};

    #[tokio::test]
    async fn source_encodes_every_known_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let peer = PeerId::generate();
        {
            let mut wtxn = storage.write_txn().unwrap();
            let files = Files::open(storage.env(), &mut wtxn, peer).unwrap();
            files
                .add(
                    &mut wtxn,
                    &FileRecord {
                        path: "a.txt".to_owned(),
                        mod_time: 0,
                        sync_time: 0,
                        digest: [1u8; 32],
                        size: 10,
                        status: FileStatus::EXISTS | FileStatus::DIGEST_KNOWN,
                    },
                )
                .unwrap();
            wtxn.commit().unwrap();
        }

        let agent = IndexAgent::new(storage, peer);
        let mut source = agent.source(&MetaInf::new()).await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let n = source.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let path_len = u32::from_be_bytes(buf[0..4].try_into().unwrap()) as usize;
        assert_eq!(&buf[4..4 + path_len], b"a.txt");
    }

    #[tokio::test]
    async fn accept_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let agent = IndexAgent::new(storage, PeerId::generate());
        assert!(agent.accept(&MetaInf::new()).await.is_err());
    }
}
