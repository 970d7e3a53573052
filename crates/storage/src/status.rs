//! Per-peer status index (§3 `StatusIndex`): a DUP map recording, for every
//! set status bit, the file ids that currently have it set.
//!
//! Maintaining this view means decomposing the `status_bits` bitset into
//! single-bit `(bit, file_id)` keys on every write (§4.1.4); [`StatusIndex::sync`]
//! does that by diffing the old and new bitsets and touching only the bits
//! that actually changed.

use fsyncd_core::PeerId;
use heed3::byteorder::BE;
use heed3::types::U32;
use heed3::{Database, DatabaseFlags, RoTxn, RwTxn};

use crate::error::Result;
use crate::files::FileStatus;

type StatusMap = Database<U32<BE>, U32<BE>>;

/// Façade over one peer's `status_<hex>` DUP map.
pub struct StatusIndex {
    map: StatusMap,
}

impl StatusIndex {
    /// Opens (creating if absent) the status map namespaced for `peer`.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>, peer: PeerId) -> Result<Self> {
        let map = env
            .database_options()
            .types::<U32<BE>, U32<BE>>()
            .flags(DatabaseFlags::DUP_SORT | DatabaseFlags::DUP_FIXED)
            .name(&format!("status_{}", peer.to_hex()))
            .create(wtxn)?;
        Ok(Self { map })
    }

    /// Reconciles the index for `file_id` from its previous and current bitsets.
    ///
    /// Bits that went from unset to set gain a `(bit, file_id)` entry; bits
    /// that went from set to unset lose theirs. Unchanged bits are left alone.
    pub fn sync(
        &self,
        wtxn: &mut RwTxn<'_>,
        file_id: u32,
        old: FileStatus,
        new: FileStatus,
    ) -> Result<()> {
        for bit in 0..32u32 {
            let mask = FileStatus::from_bits_truncate(1 << bit);
            let was_set = old.contains(mask);
            let is_set = new.contains(mask);
            if was_set && !is_set {
                self.map.delete_one_duplicate(wtxn, &bit, &file_id)?;
            } else if is_set && !was_set {
                self.map.put(wtxn, &bit, &file_id)?;
            }
        }
        Ok(())
    }

    /// Removes every bit entry for `file_id` when the record is deleted outright.
    pub fn remove_all(&self, wtxn: &mut RwTxn<'_>, file_id: u32, status: FileStatus) -> Result<()> {
        self.sync(wtxn, file_id, status, FileStatus::empty())
    }

    /// Lists every file id with `bit` set, in ascending order.
    pub fn list(&self, rtxn: &RoTxn<'_>, bit: u32) -> Result<Vec<u32>> {
        let mut out = Vec::new();
        for entry in self.map.iter_dup_of(rtxn, &bit)? {
            let (_, file_id) = entry?;
            out.push(file_id);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Storage;

    #[test]
    fn sync_tracks_bit_transitions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peer = PeerId::generate();
        let index = StatusIndex::open(storage.env(), &mut wtxn, peer).expect("open index");

        index.sync(&mut wtxn, 5, FileStatus::empty(), FileStatus::EXISTS).unwrap();
        assert_eq!(index.list(&wtxn, 0).unwrap(), vec![5]);

        index
            .sync(&mut wtxn, 5, FileStatus::EXISTS, FileStatus::EXISTS | FileStatus::DIGEST_KNOWN)
            .unwrap();
        assert_eq!(index.list(&wtxn, 0).unwrap(), vec![5]);
        assert_eq!(index.list(&wtxn, 1).unwrap(), vec![5]);

        index.remove_all(&mut wtxn, 5, FileStatus::EXISTS | FileStatus::DIGEST_KNOWN).unwrap();
        assert!(index.list(&wtxn, 0).unwrap().is_empty());
        assert!(index.list(&wtxn, 1).unwrap().is_empty());
        wtxn.commit().unwrap();
    }
}
