#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Per-peer connection manager (§4.3): at most one authenticated session
//! per [`fsyncd_core::PeerId`], each a framed byte stream over an opaque
//! [`Transport`]. Grounded on `original_source/filink/src/protocol.c`'s
//! handshake and its connection-table semantics.
//!
//! # Design
//!
//! [`Interlink::bind`] runs the `HELLO` handshake with a timeout, rejects
//! self-connects and version mismatches, and resolves a duplicate session
//! for the same peer via a tie-break computed identically on both ends
//! (`role == Dialer) == (local_peer_id < remote_peer_id)`) so no further
//! coordination is needed. The losing side's connection is simply dropped,
//! closing it from that end.
//!
//! # Invariants
//!
//! - Self-connect is always rejected by both participants (§8 scenario S6).
//! - At most one [`Session`] is ever registered per peer id at a time.

/// Out-of-scope trust verification seam (§6.3).
pub mod authenticator;
/// Interlink error taxonomy.
pub mod error;
/// Per-peer connection manager and connection table.
pub mod interlink;
/// Dispatch target for decoded inbound messages.
pub mod message_handler;
/// Bound session state.
pub mod session;
/// Opaque transport abstraction.
pub mod transport;

pub use authenticator::PeerAuthenticator;
pub use error::InterlinkError;
pub use interlink::{Interlink, DEFAULT_HANDSHAKE_TIMEOUT};
pub use message_handler::MessageHandler;
pub use session::{Role, Session};
pub use transport::Transport;
