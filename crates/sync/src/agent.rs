//! The `Agent` contract (§4.5): application-defined code that knows how to
//! produce or consume one kind of synced payload. `IndexAgent` and
//! `DeltaAgent` are the two concrete implementations the `node` crate
//! registers at startup.

use async_trait::async_trait;

use fsyncd_protocol::MetaInf;

use crate::error::{Result, SyncError};
use crate::io_adapter::{IStream, OStream};

/// Registered under a stable [`Agent::id`] and looked up by it whenever a
/// `STREAM_REQUEST` names that id.
///
/// Dyn-dispatched (`Arc<dyn Agent>`) so the registry can hold a
/// heterogeneous set of agents without a generic parameter leaking into
/// [`crate::engine::SyncEngine`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier this agent is registered and looked up under.
    fn id(&self) -> u32;

    /// Invoked on the *receiver* once a `STREAM_REQUEST` names this agent:
    /// opens whatever base this sync reconstructs against and the sink the
    /// reconstructed bytes are written into.
    async fn accept(&self, metainf: &MetaInf) -> Result<(Box<dyn IStream>, Box<dyn OStream>)>;

    /// Invoked on the *sender* to obtain the bytes a [`crate::engine::SyncEngine::push`]
    /// call streams to the remote peer.
    async fn source(&self, metainf: &MetaInf) -> Result<Box<dyn IStream>>;

    /// The stream this sync drove completed successfully on this side.
    async fn complete(&self, metainf: &MetaInf);

    /// The stream this sync drove ended in failure on this side.
    async fn failed(&self, metainf: &MetaInf, err: &SyncError, message: &str);
}
