#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Orchestration crate (§2, §6.3): wires storage, the message bus, the
//! remote stream factory, the interlink connection manager, and the sync
//! engine into one running [`Node`], sharing a single
//! [`fsyncd_core::PeerId`] across all of them. Nothing here parses a
//! config file or command line (§1, §6.3 Non-goals); [`Node::open`] takes
//! an already-decided listen address and sync root.
//!
//! # Design
//!
//! [`message_sender`] and [`dispatch`] are the two adapters that close the
//! loop between `interlink` and `sync`: [`message_sender::InterlinkMessageSender`]
//! lets the sync engine send without knowing about sessions or transports,
//! and [`dispatch::EngineDispatch`] is the
//! [`fsyncd_interlink::MessageHandler`] that hands every inbound message
//! the interlink's reader tasks decode back to the engine. [`node`] ties
//! both into a [`fsyncd_storage::Storage`]-backed [`Node`] that binds a
//! `tokio::net::TcpListener` and best-effort dials every address already
//! recorded in [`fsyncd_storage::peers::Peers`].
//!
//! # Invariants
//!
//! - A node's `peer_id` is generated once and persisted; restarting with a
//!   different `listen_address` or `sync_root` updates those fields in
//!   place without changing the identity peers already know it by.
//! - The message handler is wired before [`Node::run`] ever binds a
//!   listener, so no inbound connection can race the dispatch setup.

/// The [`fsyncd_interlink::MessageHandler`] that forwards decoded messages
/// to the sync engine.
pub mod dispatch;
/// The [`fsyncd_sync::MessageSender`] adapter backed by an interlink.
pub mod message_sender;
/// The wired-up [`Node`] type itself.
pub mod node;

pub use dispatch::EngineDispatch;
pub use message_sender::InterlinkMessageSender;
pub use node::Node;
