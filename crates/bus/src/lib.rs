#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! A process-local, topic-addressed publish/subscribe bus (§4.2), grounded
//! on `original_source/futils/src/msgbus.h`. Topics are `u32` constants;
//! subscribers register a handler closure per topic and receive every
//! [`Envelope`] published on it.
//!
//! # Design
//!
//! A fixed worker pool dequeues envelopes and dispatches them to the
//! subscriber set captured at dispatch time. A dedicated control thread
//! owns all subscribe/unsubscribe mutation so that [`SubscriptionHandle`]'s
//! `Drop` can block until in-flight dispatches to that subscriber finish,
//! mirroring `fmsgbus_unsubscribe`'s synchronous-quiesce contract.
//!
//! # Invariants
//!
//! - A single publisher publishing to a single topic is observed by every
//!   subscriber in publish order (§8 property 7).
//! - Dropping a [`SubscriptionHandle`] does not return until every handler
//!   invocation already dispatched to that subscriber has completed.

mod bus;
/// Topic-addressed message payload (§4.2).
pub mod envelope;
/// Bus error taxonomy.
pub mod error;
/// RAII subscription handle.
pub mod subscription;

pub use bus::{Bus, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
pub use envelope::Envelope;
pub use error::BusError;
pub use subscription::SubscriptionHandle;
