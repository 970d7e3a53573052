use std::path::Path;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use fsyncd_bus::Bus;
use fsyncd_core::{NodeConfig, NodeError, PeerId, Result};
use fsyncd_interlink::{Interlink, Role};
use fsyncd_storage::peers::{PeerRecord, Peers};
use fsyncd_storage::Storage;
use fsyncd_streams::RemoteStreamFactory;
use fsyncd_sync::{DeltaAgent, IndexAgent, SyncEngine};

use crate::dispatch::EngineDispatch;
use crate::message_sender::InterlinkMessageSender;

/// A fully wired node: storage, bus, interlink, remote stream factory, and
/// sync engine, all sharing one [`fsyncd_core::PeerId`] (§2).
///
/// Built from a [`NodeConfig`] loaded or created by [`Node::open`]; nothing
/// here parses a config file or command line (§1, §6.3 Non-goals) — that
/// collaborator hands a populated `NodeConfig` to `open` instead.
pub struct Node {
    config: NodeConfig,
    storage: Storage,
    interlink: Arc<Interlink<TcpStream>>,
    engine: Arc<SyncEngine>,
}

impl Node {
    /// Opens (creating on first run) the database rooted at `data_dir`,
    /// persists `listen_address`/`sync_root` against the stable `peer_id`
    /// already on disk (or a freshly generated one), and wires every
    /// component together. Does not yet bind a listener or dial any peer —
    /// call [`Node::run`] for that.
    pub fn open(data_dir: &Path, listen_address: impl Into<String>, sync_root: impl Into<std::path::PathBuf>) -> Result<Self> {
        let storage = Storage::open(data_dir)?;
        let config = load_or_create_config(&storage, listen_address.into(), sync_root.into())?;

        let bus = Arc::new(Bus::new());
        let factory = Arc::new(RemoteStreamFactory::new(config.peer_id, Arc::clone(&bus)));
        let interlink = Arc::new(Interlink::<TcpStream>::new(config.peer_id, Arc::clone(&bus)));

        let sender = Arc::new(InterlinkMessageSender::new(Arc::clone(&interlink)));
        let engine = Arc::new(SyncEngine::new(config.peer_id, Arc::clone(&factory), sender));
        engine.register_agent(Arc::new(IndexAgent::new(storage.clone(), config.peer_id)));
        engine.register_agent(Arc::new(DeltaAgent::new()));
        interlink.set_message_handler(Arc::new(EngineDispatch::new(Arc::clone(&engine))));

        Ok(Self { config, storage, interlink, engine })
    }

    /// This node's own identity.
    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.config.peer_id
    }

    /// The sync engine driving every stream this node is a party to.
    #[must_use]
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Records `peer`'s address, so a future [`Node::run`]'s dial-known-peers
    /// pass (or a restart) can reach it without a fresh handshake telling us
    /// again.
    pub fn remember_peer(&self, peer: PeerId, address: impl Into<String>) -> Result<()> {
        let mut wtxn = self.storage.write_txn().map_err(NodeError::from)?;
        let peers = Peers::open(self.storage.env(), &mut wtxn).map_err(NodeError::from)?;
        peers
            .put(&mut wtxn, peer, &PeerRecord { address: address.into() })
            .map_err(NodeError::from)?;
        Storage::commit(wtxn).map_err(NodeError::from)?;
        Ok(())
    }

    /// Binds `config.listen_address`, accepts inbound connections
    /// indefinitely, and best-effort dials every peer already known to
    /// [`fsyncd_storage::peers::Peers`]. Runs until the listener errors or
    /// the calling task is dropped.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_address).await?;
        tracing::info!(address = %self.config.listen_address, peer = %self.peer_id(), "listening");

        self.dial_known_peers();

        loop {
            let (socket, addr) = listener.accept().await?;
            let interlink = Arc::clone(&self.interlink);
            tokio::spawn(async move {
                match interlink.bind(socket, Role::Acceptor).await {
                    Ok(peer) => tracing::info!(%addr, %peer, "accepted session"),
                    Err(err) => tracing::warn!(%addr, %err, "inbound handshake failed"),
                }
            });
        }
    }

    fn dial_known_peers(self: &Arc<Self>) {
        let storage = self.storage.clone();
        let interlink = Arc::clone(&self.interlink);
        tokio::spawn(async move {
            let addresses = match known_peer_addresses(&storage) {
                Ok(addresses) => addresses,
                Err(err) => {
                    tracing::warn!(%err, "failed to enumerate known peers");
                    return;
                }
            };
            for address in addresses {
                match TcpStream::connect(&address).await {
                    Ok(socket) => match interlink.bind(socket, Role::Dialer).await {
                        Ok(peer) => tracing::info!(%address, %peer, "dialed known peer"),
                        Err(err) => tracing::warn!(%address, %err, "handshake with known peer failed"),
                    },
                    Err(err) => tracing::warn!(%address, %err, "failed to dial known peer"),
                }
            }
        });
    }
}

fn load_or_create_config(
    storage: &Storage,
    listen_address: String,
    sync_root: std::path::PathBuf,
) -> Result<NodeConfig> {
    let mut wtxn = storage.write_txn().map_err(NodeError::from)?;
    let config_map = fsyncd_storage::config::Config::open(storage.env(), &mut wtxn).map_err(NodeError::from)?;
    let existing = config_map.get(&wtxn).map_err(NodeError::from)?;
    let config = match existing {
        Some(mut config) => {
            config.listen_address = listen_address;
            config.sync_root = sync_root;
            config
        }
        None => NodeConfig::new(listen_address, sync_root),
    };
    config_map.put(&mut wtxn, &config).map_err(NodeError::from)?;
    Storage::commit(wtxn).map_err(NodeError::from)?;
    Ok(config)
}

fn known_peer_addresses(storage: &Storage) -> Result<Vec<String>> {
    let mut wtxn = storage.write_txn().map_err(NodeError::from)?;
    let peers = Peers::open(storage.env(), &mut wtxn).map_err(NodeError::from)?;
    let known = peers.iter(&wtxn).map_err(NodeError::from)?;
    Storage::commit(wtxn).map_err(NodeError::from)?;
    Ok(known.into_iter().map(|(_, record)| record.address).collect())
}
