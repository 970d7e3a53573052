#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Embedded, transactional, ordered key-value storage for a single node's
//! database (§4.1). Every other crate in the workspace reaches the on-disk
//! state exclusively through the typed façades here — nothing outside this
//! crate opens an LMDB map directly.
//!
//! # Design
//!
//! Grounded on `original_source/fdb/src/db.c`, which wraps LMDB directly via
//! `mdb_env_create`/`mdb_txn_begin`/`mdb_dbi_open`; this crate uses [`heed3`]
//! as the safe equivalent of that FFI layer. Each façade
//! ([`peers::Peers`], [`dirs::Dirs`], [`files::Files`], [`status::StatusIndex`],
//! [`progress::DownloadProgress`]) owns the named maps it needs and is built
//! from a shared [`env::Storage`] handle.
//!
//! # Invariants
//!
//! - [`ids::IdAllocator`] never hands out an id currently recorded as used;
//!   freeing then generating may reuse it (§4.1.3, tested in `ids::tests`).
//! - [`files::Files`]'s `path -> id` secondary index stays a bijection with
//!   the primary map across add/update/remove (§3 invariant, tested in
//!   `files::tests`).
//! - [`status::StatusIndex`] reflects exactly the bits set on every live
//!   [`files::FileRecord`] (§3 invariant, tested in `status::tests`).

/// Shared environment handle (§4.1 Ownership).
pub mod env;
/// Workspace-wide error taxonomy (§4.1.2).
pub mod error;
/// Reusable `u32` id allocator (§4.1.3).
pub mod ids;
/// Persisted [`fsyncd_core::NodeConfig`] singleton.
pub mod config;
/// Known-peer directory (§3 `PeerRecord`).
pub mod peers;
/// Synchronized-directory registry (§3 `DirRecord`, `DirScanStatus`).
pub mod dirs;
/// Per-peer file registry (§3 `FileRecord`).
pub mod files;
/// Per-peer status index (§3 `StatusIndex`).
pub mod status;
/// Per-peer download progress (§3 `DownloadProgress`).
pub mod progress;

pub use env::Storage;
pub use error::StorageError;
