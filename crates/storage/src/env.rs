use std::path::Path;
use std::sync::Arc;

use heed3::{Env, EnvOpenOptions};

use crate::error::{Result, StorageError};

/// Reference-counted handle onto the on-disk environment (§4.1 Ownership).
///
/// Cloning is cheap: every façade and iterator shares the same `Env`, which
/// is dropped only once the last handle goes out of scope, mirroring
/// `fdb_retain`/`fdb_release` in the original.
#[derive(Clone)]
pub struct Storage {
    env: Arc<Env>,
}

/// Default environment size: generous enough that ordinary workloads never
/// hit `MAP_FULL`, small enough to avoid surprising disk reservations.
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024 * 1024;

/// Maximum number of named maps a single environment may hold. Every
/// per-peer façade opens its own `files`/`status`/`progress` maps, so this
/// must comfortably exceed `3 * expected_peer_count`.
pub const DEFAULT_MAX_DBS: u32 = 4096;

impl Storage {
    /// Opens (creating if absent) the environment rooted at `path`.
    #[allow(unsafe_code)]
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        // SAFETY: caller guarantees `path` is not concurrently opened by an
        // incompatible LMDB version or a process outside this one; this is
        // the same contract `original_source/fdb/src/db.c` places on
        // `mdb_env_open`.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(DEFAULT_MAP_SIZE)
                .max_dbs(DEFAULT_MAX_DBS)
                .open(path)?
        };
        tracing::debug!(path = %path.display(), "storage environment opened");
        Ok(Self { env: Arc::new(env) })
    }

    /// Borrows the underlying heed environment for façade construction.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Opens a read-write transaction.
    ///
    /// Mirrors `fdb_transaction_start`'s begin-failure log
    /// (`original_source/fdb/src/db.c`).
    pub fn write_txn(&self) -> Result<heed3::RwTxn<'_>> {
        match self.env.write_txn() {
            Ok(txn) => {
                tracing::debug!("write transaction begun");
                Ok(txn)
            }
            Err(err) => {
                tracing::warn!(error = %err, "write transaction failed to begin");
                Err(StorageError::from(err))
            }
        }
    }

    /// Opens a read-only transaction.
    pub fn read_txn(&self) -> Result<heed3::RoTxn<'_>> {
        self.env.read_txn().map_err(StorageError::from)
    }

    /// Commits `wtxn`, logging the outcome.
    ///
    /// Mirrors `fdb_transaction_commit`'s commit-failure log
    /// (`original_source/fdb/src/db.c`); a map-size exhaustion surfaces here
    /// as a commit failure, same as the original's `MDB_MAP_FULL`.
    pub fn commit(wtxn: heed3::RwTxn<'_>) -> Result<()> {
        match wtxn.commit() {
            Ok(()) => {
                tracing::debug!("write transaction committed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "write transaction commit failed, possible map exhaustion");
                Err(StorageError::from(err))
            }
        }
    }

    /// Aborts `wtxn`, discarding its writes.
    ///
    /// Mirrors `fdb_transaction_abort` (`original_source/fdb/src/db.c`).
    pub fn abort(wtxn: heed3::RwTxn<'_>) {
        wtxn.abort();
        tracing::debug!("write transaction aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("db");
        let storage = Storage::open(&path).expect("open");
        let _txn = storage.read_txn().expect("read txn");
        assert!(path.exists());
    }

    #[test]
    fn handle_clone_shares_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let other = storage.clone();
        assert!(std::ptr::eq(storage.env(), other.env()));
    }
}
