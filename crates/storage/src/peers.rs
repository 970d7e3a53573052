//! Known-peer directory (§3 `PeerRecord`).

use fsyncd_core::PeerId;
use heed3::types::Bytes;
use heed3::{Database, RoTxn, RwTxn};

use crate::error::{Result, StorageError};

const MAP_NAME: &str = "peers";

/// Address advertised for a known peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// Last-advertised network address, e.g. `"203.0.113.4:4242"`.
    pub address: String,
}

impl PeerRecord {
    fn encode(&self) -> Vec<u8> {
        self.address.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let address = String::from_utf8(bytes.to_vec())
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(Self { address })
    }
}

/// Façade over the `peers` map: `PeerId -> PeerRecord`.
pub struct Peers {
    map: Database<Bytes, Bytes>,
}

impl Peers {
    /// Opens (creating if absent) the peers map.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>) -> Result<Self> {
        let map = env
            .database_options()
            .types::<Bytes, Bytes>()
            .name(MAP_NAME)
            .create(wtxn)?;
        Ok(Self { map })
    }

    /// Inserts or updates the record for `peer`, created on first learn,
    /// updated on every subsequent re-advertisement.
    pub fn put(&self, wtxn: &mut RwTxn<'_>, peer: PeerId, record: &PeerRecord) -> Result<()> {
        self.map.put(wtxn, peer.as_bytes(), &record.encode())?;
        Ok(())
    }

    /// Looks up the record for `peer`.
    pub fn get(&self, rtxn: &RoTxn<'_>, peer: PeerId) -> Result<Option<PeerRecord>> {
        match self.map.get(rtxn, peer.as_bytes())? {
            Some(bytes) => Ok(Some(PeerRecord::decode(bytes)?)),
            None => Ok(None),
        }
    }

    /// Tombstones (removes) the record for `peer` on explicit removal.
    pub fn remove(&self, wtxn: &mut RwTxn<'_>, peer: PeerId) -> Result<()> {
        self.map.delete(wtxn, peer.as_bytes())?;
        Ok(())
    }

    /// Iterates every known peer, e.g. to reconnect to all of them on startup.
    pub fn iter(&self, rtxn: &RoTxn<'_>) -> Result<Vec<(PeerId, PeerRecord)>> {
        let mut out = Vec::new();
        for entry in self.map.iter(rtxn)? {
            let (key, bytes) = entry?;
            let mut peer_bytes = [0u8; 16];
            peer_bytes.copy_from_slice(key);
            out.push((PeerId::from_bytes(peer_bytes), PeerRecord::decode(bytes)?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Storage;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peers = Peers::open(storage.env(), &mut wtxn).expect("open peers");

        let peer = PeerId::generate();
        let record = PeerRecord { address: "203.0.113.4:4242".to_owned() };
        peers.put(&mut wtxn, peer, &record).unwrap();
        assert_eq!(peers.get(&wtxn, peer).unwrap(), Some(record));
        wtxn.commit().unwrap();
    }

    #[test]
    fn iter_lists_every_known_peer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peers = Peers::open(storage.env(), &mut wtxn).expect("open peers");

        let peer_a = PeerId::generate();
        let peer_b = PeerId::generate();
        let record_a = PeerRecord { address: "203.0.113.4:4242".to_owned() };
        let record_b = PeerRecord { address: "203.0.113.5:4242".to_owned() };
        peers.put(&mut wtxn, peer_a, &record_a).unwrap();
        peers.put(&mut wtxn, peer_b, &record_b).unwrap();

        let mut found = peers.iter(&wtxn).unwrap();
        found.sort_by_key(|(peer, _)| *peer);
        let mut expected = vec![(peer_a, record_a), (peer_b, record_b)];
        expected.sort_by_key(|(peer, _)| *peer);
        assert_eq!(found, expected);
        wtxn.commit().unwrap();
    }

    #[test]
    fn remove_tombstones_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peers = Peers::open(storage.env(), &mut wtxn).expect("open peers");

        let peer = PeerId::generate();
        let record = PeerRecord { address: "203.0.113.4:4242".to_owned() };
        peers.put(&mut wtxn, peer, &record).unwrap();
        peers.remove(&mut wtxn, peer).unwrap();
        assert_eq!(peers.get(&wtxn, peer).unwrap(), None);
        wtxn.commit().unwrap();
    }
}
