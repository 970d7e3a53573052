use std::sync::Arc;

use fsyncd_core::PeerId;
use fsyncd_protocol::Message;
use tokio::io::WriteHalf;
use tokio::sync::{Mutex, Notify};

use crate::error::Result;
use crate::transport::Transport;

/// Which side of a connection dialed out versus accepted, used to resolve
/// the duplicate-session tie-break (§4.3 Connection table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This node initiated the connection.
    Dialer,
    /// This node accepted an inbound connection.
    Acceptor,
}

/// An established, authenticated session with one peer.
///
/// Writes are serialized by `write_half`'s mutex, since the underlying
/// transport does not tolerate interleaved writes on one direction (§4.3
/// I/O discipline). Reads happen exclusively on the reader task spawned
/// when the session is bound, so they need no separate lock.
pub struct Session<T: Transport + 'static> {
    peer_id: PeerId,
    role: Role,
    write_half: Mutex<WriteHalf<T>>,
    closed: Arc<Notify>,
}

impl<T: Transport + 'static> Session<T> {
    pub(crate) fn new(peer_id: PeerId, role: Role, write_half: WriteHalf<T>) -> Self {
        Self { peer_id, role, write_half: Mutex::new(write_half), closed: Arc::new(Notify::new()) }
    }

    /// The remote peer this session is bound to.
    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Whether this node dialed or accepted the underlying connection.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn closed_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.closed)
    }

    /// Signals the reader task bound to this session to stop, used when a
    /// duplicate session wins the tie-break over this one.
    pub(crate) fn close(&self) {
        self.closed.notify_one();
    }

    /// Sends `message` under the write mutex.
    pub async fn send(&self, message: &Message) -> Result<()> {
        let mut guard = self.write_half.lock().await;
        message.write_to(&mut *guard).await?;
        Ok(())
    }
}
