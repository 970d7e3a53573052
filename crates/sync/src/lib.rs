#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Sync engine and agent registry (§4.5): the layer above the remote stream
//! factory that knows *what* a stream carries. An [`agent::Agent`]
//! registers under a stable id; [`engine::SyncEngine`] looks agents up by
//! that id to drive both halves of a sync — `push`/`sync` on the side that
//! initiates, `handle_message` on the side that responds to an inbound
//! `STREAM_REQUEST`.
//!
//! # Design
//!
//! Grounded in `original_source/fsync/src/sync_engine.h`/`.c`'s
//! `fsync_agent_t` vtable and `fsync_engine_sync`. [`index_agent::IndexAgent`]
//! and [`delta_agent::DeltaAgent`] are the two concrete agents the original
//! names (`search_engine_sync_agent.c` and the `frsync_t` integration in
//! `rsync.c`); both are registered by the `node` crate at startup.
//!
//! [`io_adapter`] reuses the `IStream`/`OStream` naming from §4.4.1 at this
//! layer too, rather than coupling `Agent` directly to
//! `fsyncd_streams::MemIoReader`/`MemIoWriter` — an agent's base or target
//! is just as often a local file.
//!
//! # Invariants
//!
//! - `register_agent` is idempotent by [`agent::Agent::id`] (§4.5 Operations).
//! - Exactly one of `complete`/`failed` is invoked per sync on each side.
//! - Partial target data is never exposed to the application; agents stage
//!   and atomically promote (§4.5 Failure semantics).

/// The `Agent` contract and its dyn-safe async methods.
pub mod agent;
/// Concrete agent serving the local directory index.
pub mod index_agent;
/// Concrete agent reconstructing a file via delta transfer.
pub mod delta_agent;
/// Error taxonomy for the sync engine and its agents.
pub mod error;
/// Drives a stream end-to-end on behalf of a registered agent.
pub mod engine;
/// `IStream`/`OStream` abstractions an agent's `accept`/`source` return.
pub mod io_adapter;
/// Decouples the engine from a concrete transport.
pub mod message_sender;

pub use agent::Agent;
pub use delta_agent::DeltaAgent;
pub use engine::SyncEngine;
pub use error::SyncError;
pub use index_agent::IndexAgent;
pub use io_adapter::{FileIStream, FileOStream, IStream, OStream};
pub use message_sender::MessageSender;
