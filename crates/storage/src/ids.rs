//! Reusable `u32` id allocator (§4.1.3).
//!
//! Built on a single `DUP_SORT | DUP_FIXED` map holding two multi-valued
//! keys, `"used"` and `"free"`, each fanning out to the `u32` ids currently
//! in that state. Grounded directly on
//! `original_source/fdb/src/sync/ids.c`, which keeps the same two-key
//! layout over a raw LMDB DUP database.

use heed3::byteorder::BE;
use heed3::types::{Str, U32};
use heed3::{Database, DatabaseFlags, RwTxn};

use crate::error::{Result, StorageError};

const USED: &str = "used";
const FREE: &str = "free";

type IdMap = Database<Str, U32<BE>>;

/// A named, reusable id space backed by one DUP map.
pub struct IdAllocator {
    map: IdMap,
}

impl IdAllocator {
    /// Opens (creating if absent) the id map named `name` in `env`.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>, name: &str) -> Result<Self> {
        let map = env
            .database_options()
            .types::<Str, U32<BE>>()
            .flags(DatabaseFlags::DUP_SORT | DatabaseFlags::DUP_FIXED)
            .name(name)
            .create(wtxn)?;
        Ok(Self { map })
    }

    /// Allocates an id: reuses the smallest free id if any exist, otherwise
    /// one past the current maximum used id (0 if none is used yet).
    ///
    /// Mirrors `fdb_id_generate`: pop the first `FREE` duplicate if present;
    /// else walk to the last `USED` duplicate via `SET` + `LAST_DUP` and
    /// take `max + 1`.
    pub fn generate(&self, wtxn: &mut RwTxn<'_>) -> Result<u32> {
        let reused = self
            .map
            .iter_dup_of(wtxn, &FREE)?
            .next()
            .transpose()?
            .map(|(_, id)| id);

        if let Some(id) = reused {
            self.map.delete_one_duplicate(wtxn, &FREE, &id)?;
            self.map.put(wtxn, &USED, &id)?;
            return Ok(id);
        }

        let last_used = self
            .map
            .iter_dup_of(wtxn, &USED)?
            .last()
            .transpose()?
            .map(|(_, id)| id);

        let next = match last_used {
            Some(max) => max.checked_add(1).ok_or_else(|| {
                tracing::warn!(max, "id space exhausted");
                StorageError::MapFull
            })?,
            None => 0,
        };
        self.map.put(wtxn, &USED, &next)?;
        Ok(next)
    }

    /// Returns `id` to the free list. No-op if `id` was not in `USED`.
    ///
    /// Mirrors `fdb_id_free`.
    pub fn free(&self, wtxn: &mut RwTxn<'_>, id: u32) -> Result<()> {
        self.map.delete_one_duplicate(wtxn, &USED, &id)?;
        self.map.put(wtxn, &FREE, &id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Storage;

    #[test]
    fn generate_reuses_freed_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let ids = IdAllocator::open(storage.env(), &mut wtxn, "test-ids").expect("open ids");

        assert_eq!(ids.generate(&mut wtxn).unwrap(), 0);
        assert_eq!(ids.generate(&mut wtxn).unwrap(), 1);
        ids.free(&mut wtxn, 0).unwrap();
        assert_eq!(ids.generate(&mut wtxn).unwrap(), 0);
        assert_eq!(ids.generate(&mut wtxn).unwrap(), 2);
        wtxn.commit().unwrap();
    }

    proptest::proptest! {
        #[test]
        fn generate_and_free_never_double_allocate(ops in proptest::collection::vec(proptest::prelude::any::<bool>(), 1..64)) {
            let dir = tempfile::tempdir().expect("tempdir");
            let storage = Storage::open(dir.path()).expect("open");
            let mut wtxn = storage.write_txn().expect("wtxn");
            let ids = IdAllocator::open(storage.env(), &mut wtxn, "prop-ids").expect("open ids");

            let mut live = std::collections::HashSet::new();
            for op in ops {
                // `true` frees an already-live id if one exists, otherwise
                // both branches fall back to allocating.
                if op {
                    if let Some(&id) = live.iter().next() {
                        ids.free(&mut wtxn, id).unwrap();
                        live.remove(&id);
                        continue;
                    }
                }
                let id = ids.generate(&mut wtxn).unwrap();
                proptest::prop_assert!(live.insert(id), "id {id} allocated while still live");
            }
        }
    }
}
