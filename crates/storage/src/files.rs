//! Per-peer file registry (§3 `FileRecord`), namespaced by hex-encoded
//! `PeerId` per §4.1.4.

use bitflags::bitflags;
use fsyncd_core::PeerId;
use heed3::byteorder::BE;
use heed3::types::{Bytes, Str, U32};
use heed3::{Database, RoTxn, RwTxn};

use crate::error::{Result, StorageError};
use crate::ids::IdAllocator;
use crate::status::StatusIndex;

/// Maximum encoded path length, carried over from `FDB_MAX_PATH` in the
/// original C implementation. Longer paths are rejected rather than
/// truncated.
pub const MAX_PATH_LEN: usize = 1024;

bitflags! {
    /// Bits tracked per file; mirrors the generic `status_bits` register in
    /// `ffile_info_t`, naming the two bits the rest of the system reads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileStatus: u32 {
        /// The file is currently present in the peer's tree (not a tombstone).
        const EXISTS = 1 << 0;
        /// `digest` holds a computed content hash rather than all-zero placeholder bytes.
        const DIGEST_KNOWN = 1 << 1;
    }
}

/// A file known about a given peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the synchronized directory root.
    pub path: String,
    /// Source-reported modification time (seconds since the Unix epoch).
    pub mod_time: u64,
    /// Local time this record was last synchronized.
    pub sync_time: u64,
    /// Strong content digest, meaningful only when `status` has `DIGEST_KNOWN` set.
    pub digest: [u8; 32],
    /// File size in bytes.
    pub size: u64,
    /// Status bits (§3 `StatusIndex` is derived from this field).
    pub status: FileStatus,
}

impl FileRecord {
    fn encode(&self) -> Result<Vec<u8>> {
        if self.path.len() > MAX_PATH_LEN {
            return Err(StorageError::Corrupt(format!(
                "path exceeds MAX_PATH_LEN ({} > {MAX_PATH_LEN})",
                self.path.len()
            )));
        }
        let mut buf = Vec::with_capacity(8 + 8 + 32 + 8 + 4 + self.path.len());
        buf.extend_from_slice(&self.mod_time.to_be_bytes());
        buf.extend_from_slice(&self.sync_time.to_be_bytes());
        buf.extend_from_slice(&self.digest);
        buf.extend_from_slice(&self.size.to_be_bytes());
        buf.extend_from_slice(&self.status.bits().to_be_bytes());
        buf.extend_from_slice(self.path.as_bytes());
        Ok(buf)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        const HEADER: usize = 8 + 8 + 32 + 8 + 4;
        if bytes.len() < HEADER {
            return Err(StorageError::Corrupt("truncated file record".to_owned()));
        }
        let mod_time = u64::from_be_bytes(bytes[0..8].try_into().unwrap());
        let sync_time = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[16..48]);
        let size = u64::from_be_bytes(bytes[48..56].try_into().unwrap());
        let status_bits = u32::from_be_bytes(bytes[56..60].try_into().unwrap());
        let status = FileStatus::from_bits_truncate(status_bits);
        let path = String::from_utf8(bytes[HEADER..].to_vec())
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(Self { path, mod_time, sync_time, digest, size, status })
    }
}

/// Façade over one peer's `files_by_id_<hex>` / `files_by_path_<hex>` maps.
pub struct Files {
    by_id: Database<U32<BE>, Bytes>,
    by_path: Database<Str, U32<BE>>,
    ids: IdAllocator,
    status: StatusIndex,
}

impl Files {
    /// Opens (creating if absent) the file maps namespaced for `peer`.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>, peer: PeerId) -> Result<Self> {
        let hex = peer.to_hex();
        let by_id = env
            .database_options()
            .types::<U32<BE>, Bytes>()
            .name(&format!("files_by_id_{hex}"))
            .create(wtxn)?;
        let by_path = env
            .database_options()
            .types::<Str, U32<BE>>()
            .name(&format!("files_by_path_{hex}"))
            .create(wtxn)?;
        let ids = IdAllocator::open(env, wtxn, &format!("files_ids_{hex}"))?;
        let status = StatusIndex::open(env, wtxn, peer)?;
        Ok(Self { by_id, by_path, ids, status })
    }

    /// Adds a new file record, issuing a fresh `FileId`.
    pub fn add(&self, wtxn: &mut RwTxn<'_>, record: &FileRecord) -> Result<u32> {
        if self.by_path.get(wtxn, &record.path)?.is_some() {
            return Err(StorageError::AlreadyExists);
        }
        let id = self.ids.generate(wtxn)?;
        self.by_id.put(wtxn, &id, &record.encode()?)?;
        self.by_path.put(wtxn, &record.path, &id)?;
        self.status.sync(wtxn, id, FileStatus::empty(), record.status)?;
        Ok(id)
    }

    /// Overwrites the record at `id` in place, keeping the secondary index
    /// consistent even if the path changed.
    pub fn update(&self, wtxn: &mut RwTxn<'_>, id: u32, record: &FileRecord) -> Result<()> {
        let old_status = if let Some(old) = self.by_id.get(wtxn, &id)? {
            let old = FileRecord::decode(old)?;
            if old.path != record.path {
                self.by_path.delete(wtxn, &old.path)?;
            }
            old.status
        } else {
            FileStatus::empty()
        };
        self.by_id.put(wtxn, &id, &record.encode()?)?;
        self.by_path.put(wtxn, &record.path, &id)?;
        self.status.sync(wtxn, id, old_status, record.status)?;
        Ok(())
    }

    /// Looks up a file's id by path.
    pub fn get_id(&self, rtxn: &RoTxn<'_>, path: &str) -> Result<Option<u32>> {
        Ok(self.by_path.get(rtxn, path)?)
    }

    /// Looks up a file's record by id.
    pub fn get(&self, rtxn: &RoTxn<'_>, id: u32) -> Result<Option<FileRecord>> {
        match self.by_id.get(rtxn, &id)? {
            Some(bytes) => Ok(Some(FileRecord::decode(bytes)?)),
            None => Ok(None),
        }
    }

    /// Deletes the record at `id`, frees its id, and drops the secondary-index
    /// and status-index entries.
    pub fn remove(&self, wtxn: &mut RwTxn<'_>, id: u32) -> Result<()> {
        if let Some(bytes) = self.by_id.get(wtxn, &id)? {
            let record = FileRecord::decode(bytes)?;
            self.by_path.delete(wtxn, &record.path)?;
            self.status.remove_all(wtxn, id, record.status)?;
        }
        self.by_id.delete(wtxn, &id)?;
        self.ids.free(wtxn, id)?;
        Ok(())
    }

    /// Borrows the status index kept in sync with every record's `status`
    /// field, e.g. to list every file with a given bit set.
    #[must_use]
    pub fn status(&self) -> &StatusIndex {
        &self.status
    }

    /// Iterates every live record in id order.
    pub fn iter(&self, rtxn: &RoTxn<'_>) -> Result<Vec<(u32, FileRecord)>> {
        let mut out = Vec::new();
        for entry in self.by_id.iter(rtxn)? {
            let (id, bytes) = entry?;
            out.push((id, FileRecord::decode(bytes)?));
        }
        Ok(out)
    }
}

/// A single difference between two peers' file lists, as produced by [`diff_iter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDiff {
    /// `path` exists on the left peer but not on the right.
    Absent { path: String },
    /// `path` exists on both but digests (or sizes) differ.
    DiffContent { path: String },
}

/// Computes the difference between two peers' file lists.
///
/// A read-only derived view over two already-open [`Files`] façades; ports
/// `fdb_sync_files_iterator_diff` as a pure function rather than a stateful
/// cursor, since both inputs are already fully materializable maps.
pub fn diff_iter(rtxn: &RoTxn<'_>, left: &Files, right: &Files) -> Result<Vec<FileDiff>> {
    let mut diffs = Vec::new();
    for (_, left_record) in left.iter(rtxn)? {
        match right.get_id(rtxn, &left_record.path)? {
            None => diffs.push(FileDiff::Absent { path: left_record.path }),
            Some(right_id) => {
                let right_record = right
                    .get(rtxn, right_id)?
                    .ok_or(StorageError::NotFound)?;
                if right_record.digest != left_record.digest || right_record.size != left_record.size {
                    diffs.push(FileDiff::DiffContent { path: left_record.path });
                }
            }
        }
    }
    Ok(diffs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Storage;

    fn sample(path: &str) -> FileRecord {
        FileRecord {
            path: path.to_owned(),
            mod_time: 1,
            sync_time: 1,
            digest: [7u8; 32],
            size: 42,
            status: FileStatus::EXISTS | FileStatus::DIGEST_KNOWN,
        }
    }

    #[test]
    fn add_get_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peer = PeerId::generate();
        let files = Files::open(storage.env(), &mut wtxn, peer).expect("open files");

        let record = sample("docs/readme.md");
        let id = files.add(&mut wtxn, &record).unwrap();
        assert_eq!(files.get(&wtxn, id).unwrap(), Some(record));
        wtxn.commit().unwrap();
    }

    #[test]
    fn rejects_path_over_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peer = PeerId::generate();
        let files = Files::open(storage.env(), &mut wtxn, peer).expect("open files");

        let mut record = sample("x");
        record.path = "a".repeat(MAX_PATH_LEN + 1);
        assert!(files.add(&mut wtxn, &record).is_err());
    }

    #[test]
    fn status_index_tracks_add_update_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let peer = PeerId::generate();
        let files = Files::open(storage.env(), &mut wtxn, peer).expect("open files");

        let mut record = sample("a.txt");
        record.status = FileStatus::EXISTS;
        let id = files.add(&mut wtxn, &record).unwrap();
        assert_eq!(files.status().list(&wtxn, 0).unwrap(), vec![id]);
        assert!(files.status().list(&wtxn, 1).unwrap().is_empty());

        record.status = FileStatus::EXISTS | FileStatus::DIGEST_KNOWN;
        files.update(&mut wtxn, id, &record).unwrap();
        assert_eq!(files.status().list(&wtxn, 1).unwrap(), vec![id]);

        files.remove(&mut wtxn, id).unwrap();
        assert!(files.status().list(&wtxn, 0).unwrap().is_empty());
        assert!(files.status().list(&wtxn, 1).unwrap().is_empty());
        wtxn.commit().unwrap();
    }

    #[test]
    fn diff_iter_reports_absent_and_changed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let a = PeerId::generate();
        let b = PeerId::generate();
        let files_a = Files::open(storage.env(), &mut wtxn, a).expect("open a");
        let files_b = Files::open(storage.env(), &mut wtxn, b).expect("open b");

        files_a.add(&mut wtxn, &sample("only_on_a.txt")).unwrap();
        let mut changed_a = sample("changed.txt");
        changed_a.digest = [1u8; 32];
        files_a.add(&mut wtxn, &changed_a).unwrap();
        let mut changed_b = sample("changed.txt");
        changed_b.digest = [2u8; 32];
        files_b.add(&mut wtxn, &changed_b).unwrap();

        let diffs = diff_iter(&wtxn, &files_a, &files_b).unwrap();
        assert_eq!(diffs.len(), 2);
        assert!(diffs.contains(&FileDiff::Absent { path: "only_on_a.txt".to_owned() }));
        assert!(diffs.contains(&FileDiff::DiffContent { path: "changed.txt".to_owned() }));
        wtxn.commit().unwrap();
    }
}
