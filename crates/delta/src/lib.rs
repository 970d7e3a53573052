#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Delta calculation and application (§4.6.3-4.6.4), the sender and
//! receiver halves of reconstructing a file without transferring it whole.
//! [`calculator::calculate`] scans the desired bytes against a
//! [`fsyncd_signature::Signature`] of the receiver's existing copy and
//! emits [`command::DeltaCommand`]s; [`applier::apply`] replays them
//! against that same base to reconstruct the target.
//!
//! # Design
//!
//! The calculator rolls its checksum window incrementally byte-by-byte
//! rather than recomputing it from scratch at every position, matching
//! `fsyncd-checksums`'s `RollingChecksum::roll` contract; it only rebuilds
//! the window outright when it shrinks to fit the input's tail.
//!
//! # Invariants
//!
//! - An empty base produces a signature with zero blocks, so every command
//!   the calculator emits against it is a `LITERAL` (§4.6 Edge cases).
//! - An empty input yields `END` with no other commands.
//! - An input byte-identical to the base yields a single `COPY` covering
//!   its full length, followed by `END`.

/// Delta command wire format.
pub mod command;
/// Error taxonomy for delta calculation and application.
pub mod error;
/// Scans an input against a signature and emits commands.
pub mod calculator;
/// Replays commands against a base to reconstruct a target.
pub mod applier;

pub use applier::apply;
pub use calculator::{calculate, DEFAULT_LITERAL_FLUSH_THRESHOLD};
pub use command::DeltaCommand;
pub use error::DeltaError;
