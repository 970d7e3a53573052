use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fsyncd_bus::{Bus, Envelope};
use fsyncd_core::{topics, PeerId};
use fsyncd_protocol::{Message, PROTOCOL_VERSION};
use tokio::io::{split, ReadHalf};

use crate::authenticator::PeerAuthenticator;
use crate::error::{InterlinkError, Result};
use crate::message_handler::MessageHandler;
use crate::session::{Role, Session};
use crate::transport::Transport;

/// Default bound on how long a handshake may take before the connection is
/// abandoned (§4.3 Handshake).
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-peer connection manager (§4.3).
///
/// Maintains at most one active [`Session`] per [`PeerId`]. Every accepted
/// or dialed transport goes through [`Interlink::bind`], which performs the
/// `HELLO` handshake, rejects self-connects and version mismatches, and
/// resolves duplicate sessions via the `min(local_peer_id, remote_peer_id)`
/// tie-break (§4.3 Connection table).
pub struct Interlink<T: Transport + 'static> {
    local_peer_id: PeerId,
    sessions: Arc<DashMap<PeerId, Arc<Session<T>>>>,
    bus: Arc<Bus>,
    handshake_timeout: Duration,
    message_handler: std::sync::OnceLock<Arc<dyn MessageHandler>>,
    authenticator: Option<Arc<dyn PeerAuthenticator>>,
}

impl<T: Transport + 'static> Interlink<T> {
    /// Builds an interlink for `local_peer_id`, publishing session-lifecycle
    /// events onto `bus`.
    #[must_use]
    pub fn new(local_peer_id: PeerId, bus: Arc<Bus>) -> Self {
        Self {
            local_peer_id,
            sessions: Arc::new(DashMap::new()),
            bus,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            message_handler: std::sync::OnceLock::new(),
            authenticator: None,
        }
    }

    /// Overrides the default handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Routes every message a bound session's reader task decodes (other
    /// than `HELLO`, consumed by the handshake itself) to `handler`.
    #[must_use]
    pub fn with_message_handler(self, handler: Arc<dyn MessageHandler>) -> Self {
        self.set_message_handler(handler);
        self
    }

    /// Same as [`Self::with_message_handler`], but callable once the
    /// interlink is already behind an `Arc` — needed since the handler
    /// typically wraps the sync engine, which itself needs a message sender
    /// built from this interlink. A second call is a silent no-op; only the
    /// first-set handler is ever used.
    pub fn set_message_handler(&self, handler: Arc<dyn MessageHandler>) {
        let _ = self.message_handler.set(handler);
    }

    /// Requires every peer to pass `authenticator` once its `HELLO` identity
    /// is known, before its session is retained (§6.3).
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn PeerAuthenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Number of currently bound sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Looks up the session bound to `peer`, if any.
    #[must_use]
    pub fn session(&self, peer: PeerId) -> Option<Arc<Session<T>>> {
        self.sessions.get(&peer).map(|entry| Arc::clone(entry.value()))
    }

    /// Performs the `HELLO` handshake over `transport` and, if it succeeds
    /// and wins any duplicate-session tie-break, binds it into the
    /// connection table and spawns its reader task.
    ///
    /// Returns the remote peer id on success, including when this side
    /// lost the tie-break (the caller may still want to know who it was
    /// talking to) — but in that case no session is retained.
    pub async fn bind(&self, transport: T, role: Role) -> Result<PeerId> {
        let transport_identity = transport.peer_identity();
        let (mut read_half, mut write_half) = split(transport);

        let hello = Message::Hello { peer_id: self.local_peer_id, version: PROTOCOL_VERSION };
        let handshake = async {
            let (_, remote) =
                tokio::try_join!(hello.write_to(&mut write_half), Message::read_from(&mut read_half))?;
            Ok::<_, InterlinkError>(remote)
        };
        let remote_hello = tokio::time::timeout(self.handshake_timeout, handshake)
            .await
            .map_err(|_| InterlinkError::Timeout)??;

        let (remote_peer_id, remote_version) = match remote_hello {
            Message::Hello { peer_id, version } => (peer_id, version),
            _ => return Err(InterlinkError::ExpectedHello),
        };

        if remote_version != PROTOCOL_VERSION {
            return Err(InterlinkError::VersionMismatch);
        }
        if remote_peer_id == self.local_peer_id {
            return Err(InterlinkError::SelfConnect);
        }
        if let Some(authenticator) = &self.authenticator {
            if !authenticator.authenticate(remote_peer_id, transport_identity).await {
                return Err(InterlinkError::Unauthenticated);
            }
        }

        // Keep this session iff the peer with the lesser id is the one who
        // dialed; both endpoints compute this identically without further
        // coordination (§4.3 Connection table).
        let keep_mine = (role == Role::Dialer) == (self.local_peer_id < remote_peer_id);
        if !keep_mine {
            return Ok(remote_peer_id);
        }

        let session = Arc::new(Session::new(remote_peer_id, role, write_half));
        match self.sessions.entry(remote_peer_id) {
            Entry::Occupied(mut occupied) => {
                occupied.get().close();
                occupied.insert(Arc::clone(&session));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&session));
            }
        }

        self.spawn_reader(remote_peer_id, read_half, session);
        Ok(remote_peer_id)
    }

    fn spawn_reader(&self, peer_id: PeerId, mut read_half: ReadHalf<T>, session: Arc<Session<T>>) {
        let sessions = Arc::clone(&self.sessions);
        let bus = Arc::clone(&self.bus);
        let local_peer_id = self.local_peer_id;
        let message_handler = self.message_handler.get().cloned();
        let closed = session.closed_signal();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = closed.notified() => break,
                    result = Message::read_from(&mut read_half) => {
                        match result {
                            Ok(message) => {
                                if let Some(handler) = &message_handler {
                                    handler.handle(peer_id, message).await;
                                }
                            }
                            Err(_) => {
                                sessions.remove(&peer_id);
                                let _ = bus.publish(Envelope::new(
                                    topics::PEER_LOST,
                                    peer_id,
                                    local_peer_id,
                                    Vec::new(),
                                ));
                                break;
                            }
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsyncd_bus::Bus;
    use tokio::net::{TcpListener, TcpStream};

    #[tokio::test]
    async fn self_connect_is_rejected() {
        // Two handles sharing one peer_id (§8 scenario S6): one connects to
        // the other, the handshake completes but both sides abort it.
        let peer_id = PeerId::generate();
        let bus_a = Arc::new(Bus::with_capacity(1, 8));
        let bus_b = Arc::new(Bus::with_capacity(1, 8));
        let interlink_a: Interlink<TcpStream> = Interlink::new(peer_id, bus_a);
        let interlink_b: Interlink<TcpStream> = Interlink::new(peer_id, bus_b);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (server_result, client_result) = tokio::join!(
            async {
                let (socket, _) = listener.accept().await.unwrap();
                interlink_a.bind(socket, Role::Acceptor).await
            },
            async {
                let socket = TcpStream::connect(addr).await.unwrap();
                interlink_b.bind(socket, Role::Dialer).await
            },
        );

        assert!(matches!(server_result, Err(InterlinkError::SelfConnect)));
        assert!(matches!(client_result, Err(InterlinkError::SelfConnect)));
        assert_eq!(interlink_a.session_count(), 0);
        assert_eq!(interlink_b.session_count(), 0);
    }
}
