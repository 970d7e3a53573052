#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Wire message types and big-endian framing for the interlink (§6.1).
//! Grounded on `original_source/filink/src/protocol.c`'s field-descriptor
//! marshalling table, reworked as a plain `match` over [`Message`] variants
//! rather than a runtime-interpreted descriptor table, and on the
//! length-prefixed framing idiom in `swedishembedded-sven`'s P2P codec.
//!
//! # Design
//!
//! No outer envelope length-prefixes a whole message: every variable-length
//! field (`metainf`, `STREAM_DATA`'s `data`) is preceded by its own `u32`
//! size, so [`Message::read_from`] can dispatch on `msg_type` and then read
//! each field in declared order directly off an `AsyncRead`.

/// Wire error taxonomy.
pub mod error;
/// Self-describing typed key/value container (`metainf`).
pub mod metainf;
/// Wire message types and async framing.
pub mod message;

pub use error::ProtocolError;
pub use message::{Message, MAX_CHUNK_BYTES, PROTOCOL_VERSION};
pub use metainf::{MetaInf, MetaValue};
