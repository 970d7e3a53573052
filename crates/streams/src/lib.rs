#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Remote stream factory (§4.4): multiplexed, ordered byte streams carried
//! as `STREAM_REQUEST`/`STREAM`/`STREAM_DATA`/`STREAM_END` frames
//! (`fsyncd_protocol::Message`). Grounded on
//! `original_source/fsync/src/rstream.c`'s `frstream_factory_t` state
//! machine and `original_source/futils/src/stream.c`'s bounded pipe.
//!
//! # Design
//!
//! [`mem_io`] is the bounded byte pipe every accepted stream writes into;
//! its block-list FIFO is what gives a stream's memory footprint a fixed
//! ceiling regardless of how much data crosses it. [`factory`] owns the
//! receiver-side bookkeeping — the at-most-one-pending-request table, the
//! `stream_id` allocator, and the reassembly buffer that holds
//! out-of-order chunks until the gap closes or the reconnect-wait budget
//! expires.
//!
//! # Invariants
//!
//! - At most one request is ever pending for a given `(src, dst, cookie)`
//!   (§4.4.4); a second concurrent request is rejected outright.
//! - A stream's buffered, unread data never exceeds
//!   `block_size * max_blocks` (§8 scenario S4).
//! - Out-of-order `STREAM_DATA` is held, not dropped, until either the gap
//!   closes or [`factory::DEFAULT_RECONNECT_WAIT`] elapses with no
//!   progress, at which point the stream ends in error (§4.4.4 Ordering).

/// Stream error taxonomy.
pub mod error;
/// Receiver-side state machine, ordering, and backpressure.
pub mod factory;
/// Bounded in-memory byte pipe shared by a stream's reader and writer halves.
pub mod mem_io;

pub use error::StreamError;
pub use factory::{
    RemoteStreamFactory, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_BLOCKS, DEFAULT_RECONNECT_WAIT,
};
pub use mem_io::{MemIoReader, MemIoWriter, StreamStatus};
