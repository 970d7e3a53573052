#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The two hash primitives the signature calculator, delta calculator, and
//! delta applier all share (§4.6): a rolling weak checksum cheap enough to
//! update one byte at a time while scanning an entire file, and a strong
//! block digest that confirms a weak match before trusting it.
//!
//! # Invariants
//!
//! - [`rolling::RollingChecksum::roll`] and recomputing from scratch over
//!   the same window always agree (§4.6 "numeric semantics").
//! - [`strong::strong_hash`] is deterministic: identical input bytes always
//!   produce identical output.

/// Error taxonomy for the rolling checksum.
pub mod error;
/// Adler-32-style rolling weak checksum.
pub mod rolling;
/// BLAKE2b-256 strong block digest.
pub mod strong;

pub use error::RollingError;
pub use rolling::RollingChecksum;
pub use strong::{strong_hash, STRONG_HASH_LEN};
