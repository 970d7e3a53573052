#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fsyncd-core` holds the identifiers, configuration types, and error
//! taxonomy shared by every other crate in the workspace: [`PeerId`], the
//! persisted [`NodeConfig`], and [`NodeError`], the single error type every
//! fallible operation across `storage`, `bus`, `interlink`, `streams`,
//! `delta`, and `sync` eventually converts into.
//!
//! # Design
//!
//! Per-crate error enums (`storage::StorageError`, `bus::BusError`, and so
//! on) stay local to their crate and convert into [`NodeError`] via `From`
//! at the boundary where a caller needs to unify them.
//!
//! # Invariants
//!
//! - [`PeerId`] byte order defines tie-breaks (connection de-duplication,
//!   §4.3) and is never reinterpreted as a native integer.
//! - [`NodeConfig`] is a pure data record; nothing in this crate parses a
//!   config file (that remains an external collaborator).

/// Workspace-wide error taxonomy (§7).
pub mod error;
/// Persisted per-node configuration record (§3 `NodeConfig`).
pub mod config;
/// 128-bit opaque peer identifier (§3 `PeerId`).
pub mod peer_id;
/// Well-known message bus topic ids shared across crates.
pub mod topics;

pub use config::NodeConfig;
pub use error::NodeError;
pub use peer_id::PeerId;
