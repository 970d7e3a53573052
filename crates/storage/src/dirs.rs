//! Synchronized-directory registry (§3 `DirRecord`, `DirScanStatus`).

use heed3::byteorder::BE;
use heed3::types::{Bytes, Str, U32};
use heed3::{Database, RoTxn, RwTxn};

use crate::error::{Result, StorageError};
use crate::ids::IdAllocator;

/// A registered synchronization root, identified by a locally unique `DirId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    /// Absolute filesystem path of the directory.
    pub path: String,
}

/// Façade over the `dirs` map and its `path -> id` secondary index.
pub struct Dirs {
    by_id: Database<U32<BE>, Str>,
    by_path: Database<Str, U32<BE>>,
    ids: IdAllocator,
}

impl Dirs {
    /// Opens (creating if absent) the dirs maps and their id allocator.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>) -> Result<Self> {
        let by_id = env
            .database_options()
            .types::<U32<BE>, Str>()
            .name("dirs_by_id")
            .create(wtxn)?;
        let by_path = env
            .database_options()
            .types::<Str, U32<BE>>()
            .name("dirs_by_path")
            .create(wtxn)?;
        let ids = IdAllocator::open(env, wtxn, "dirs_ids")?;
        Ok(Self { by_id, by_path, ids })
    }

    /// Registers `path`, issuing a fresh `DirId` via the allocator (§4.1.3).
    /// Fails with [`StorageError::AlreadyExists`] if `path` is already registered.
    pub fn add(&self, wtxn: &mut RwTxn<'_>, path: &str) -> Result<u32> {
        if self.by_path.get(wtxn, path)?.is_some() {
            return Err(StorageError::AlreadyExists);
        }
        let id = self.ids.generate(wtxn)?;
        self.by_id.put(wtxn, &id, path)?;
        self.by_path.put(wtxn, path, &id)?;
        Ok(id)
    }

    /// Looks up a directory's id by its path.
    pub fn get_id(&self, rtxn: &RoTxn<'_>, path: &str) -> Result<Option<u32>> {
        Ok(self.by_path.get(rtxn, path)?)
    }

    /// Looks up a directory's record by its id.
    pub fn get(&self, rtxn: &RoTxn<'_>, id: u32) -> Result<Option<DirRecord>> {
        Ok(self.by_id.get(rtxn, &id)?.map(|path| DirRecord { path: path.to_owned() }))
    }

    /// Removes `id` and its secondary-index entry, freeing the id for reuse.
    pub fn remove(&self, wtxn: &mut RwTxn<'_>, id: u32) -> Result<()> {
        if let Some(path) = self.by_id.get(wtxn, &id)?.map(str::to_owned) {
            self.by_path.delete(wtxn, &path)?;
        }
        self.by_id.delete(wtxn, &id)?;
        self.ids.free(wtxn, id)?;
        Ok(())
    }

    /// Iterates all registered directories in id order, materializing each record.
    pub fn iter(&self, rtxn: &RoTxn<'_>) -> Result<Vec<(u32, DirRecord)>> {
        let mut out = Vec::new();
        for entry in self.by_id.iter(rtxn)? {
            let (id, path) = entry?;
            out.push((id, DirRecord { path: path.to_owned() }));
        }
        Ok(out)
    }
}

/// Transient per-directory scan cursor used by the external indexer,
/// deleted once the walk finishes (§3 `DirScanStatus`).
pub struct DirScanStatus {
    map: Database<U32<BE>, Bytes>,
}

impl DirScanStatus {
    /// Opens (creating if absent) the scan-status map.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>) -> Result<Self> {
        let map = env
            .database_options()
            .types::<U32<BE>, Bytes>()
            .name("dirs_scan_status")
            .create(wtxn)?;
        Ok(Self { map })
    }

    /// Records (or updates) the resume cursor for `dir_id`.
    pub fn set(&self, wtxn: &mut RwTxn<'_>, dir_id: u32, resume_path: &str) -> Result<()> {
        self.map.put(wtxn, &dir_id, resume_path.as_bytes())?;
        Ok(())
    }

    /// Reads the resume cursor for `dir_id`, if the walk is still in progress.
    pub fn get(&self, rtxn: &RoTxn<'_>, dir_id: u32) -> Result<Option<String>> {
        match self.map.get(rtxn, &dir_id)? {
            Some(bytes) => Ok(Some(
                String::from_utf8(bytes.to_vec()).map_err(|e| StorageError::Corrupt(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// Clears the cursor once the walk finishes.
    pub fn clear(&self, wtxn: &mut RwTxn<'_>, dir_id: u32) -> Result<()> {
        self.map.delete(wtxn, &dir_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Storage;

    #[test]
    fn add_rejects_duplicate_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let dirs = Dirs::open(storage.env(), &mut wtxn).expect("open dirs");

        let id = dirs.add(&mut wtxn, "/sync/photos").unwrap();
        assert_eq!(dirs.get_id(&wtxn, "/sync/photos").unwrap(), Some(id));
        assert!(matches!(dirs.add(&mut wtxn, "/sync/photos"), Err(StorageError::AlreadyExists)));
        wtxn.commit().unwrap();
    }

    #[test]
    fn remove_frees_id_for_reuse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let dirs = Dirs::open(storage.env(), &mut wtxn).expect("open dirs");

        let a = dirs.add(&mut wtxn, "/sync/a").unwrap();
        dirs.remove(&mut wtxn, a).unwrap();
        let b = dirs.add(&mut wtxn, "/sync/b").unwrap();
        assert_eq!(a, b);
        wtxn.commit().unwrap();
    }
}
