//! Well-known [message bus](https://docs.rs/fsyncd-bus) topic ids shared
//! across crates, so `interlink`, `streams`, and `sync` agree on them
//! without a circular dependency on the bus crate itself.

/// Published when a session is torn down by an I/O failure (§4.3 Failure).
pub const PEER_LOST: u32 = 1;

/// Published when a peer's `NODE_STATUS` bits change.
pub const NODE_STATUS: u32 = 2;

/// Published for every inbound `STREAM_DATA` chunk, keyed further by stream id
/// in the envelope payload (§4.4).
pub const STREAM_DATA: u32 = 3;

/// Published when a stream closes, successfully or otherwise (§4.4).
pub const STREAM_END: u32 = 4;
