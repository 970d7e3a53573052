//! Per-peer in-flight download progress (§3 `DownloadProgress`).

use fsyncd_core::PeerId;
use heed3::byteorder::BE;
use heed3::types::U32;
use heed3::{Database, RoTxn, RwTxn};

use crate::error::Result;

type ProgressMap = Database<U32<BE>, heed3::types::U64<BE>>;

/// Façade over one peer's `progress_<hex>` map: `FileId -> received_bytes`.
pub struct DownloadProgress {
    map: ProgressMap,
}

impl DownloadProgress {
    /// Opens (creating if absent) the progress map namespaced for `peer`.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>, peer: PeerId) -> Result<Self> {
        let map = env
            .database_options()
            .types::<U32<BE>, heed3::types::U64<BE>>()
            .name(&format!("progress_{}", peer.to_hex()))
            .create(wtxn)?;
        Ok(Self { map })
    }

    /// Records the number of bytes received so far for `file_id`.
    pub fn set(&self, wtxn: &mut RwTxn<'_>, file_id: u32, received_bytes: u64) -> Result<()> {
        self.map.put(wtxn, &file_id, &received_bytes)?;
        Ok(())
    }

    /// Reads the current progress for `file_id`, if a download is in flight.
    pub fn get(&self, rtxn: &RoTxn<'_>, file_id: u32) -> Result<Option<u64>> {
        Ok(self.map.get(rtxn, &file_id)?)
    }

    /// Clears progress once the download completes or is abandoned.
    pub fn clear(&self, wtxn: &mut RwTxn<'_>, file_id: u32) -> Result<()> {
        self.map.delete(wtxn, &file_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Storage;

    #[test]
    fn set_get_clear_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peer = PeerId::generate();
        let progress = DownloadProgress::open(storage.env(), &mut wtxn, peer).expect("open progress");

        progress.set(&mut wtxn, 3, 2048).unwrap();
        assert_eq!(progress.get(&wtxn, 3).unwrap(), Some(2048));
        progress.clear(&mut wtxn, 3).unwrap();
        assert_eq!(progress.get(&wtxn, 3).unwrap(), None);
        wtxn.commit().unwrap();
    }
}
