#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Signature calculation and loading (§4.6.1-4.6.2): the half of delta
//! reconstruction that runs against the *receiver's* existing copy of a
//! file. [`calculator::calculate`] partitions a base stream into
//! fixed-length blocks and records each one's weak and strong checksum;
//! [`signature::Signature::load`] parses that wire format back and indexes
//! it by weak hash so the delta calculator's scan (`fsyncd-delta`) can look
//! up a candidate block in O(1).
//!
//! # Invariants
//!
//! - Every block is `block_size` bytes except possibly the last
//!   (§4.6.1 "last may be short").
//! - [`signature::Signature::candidates`] never omits a block sharing the
//!   queried weak hash; false positives are expected and resolved by the
//!   strong hash.

/// Error taxonomy for signature calculation and loading.
pub mod error;
/// Base-stream partitioning and checksum recording.
pub mod calculator;
/// Loaded, weak-hash-indexed signature.
pub mod signature;

pub use calculator::{calculate, DEFAULT_BLOCK_SIZE};
pub use error::SignatureError;
pub use signature::{BlockRecord, Signature, SignatureState};
