use std::path::PathBuf;

use crate::peer_id::PeerId;

/// Per-node configuration record (§3).
///
/// Exactly one `NodeConfig` exists per database. It is created on first
/// start and thereafter mutated only by administrative operations — nothing
/// in this crate parses a config file or command line; that collaborator
/// lives outside this workspace (§6.3 Non-goals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// This node's own identity, generated once on first start.
    pub peer_id: PeerId,
    /// Address the interlink listener binds and advertises to peers.
    pub listen_address: String,
    /// Root of the locally synchronized directory tree.
    pub sync_root: PathBuf,
}

impl NodeConfig {
    /// Builds a fresh config for a brand-new database, generating a new [`PeerId`].
    #[must_use]
    pub fn new(listen_address: impl Into<String>, sync_root: impl Into<PathBuf>) -> Self {
        Self {
            peer_id: PeerId::generate(),
            listen_address: listen_address.into(),
            sync_root: sync_root.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assigns_distinct_peer_ids() {
        let a = NodeConfig::new("127.0.0.1:4242", "/tmp/a");
        let b = NodeConfig::new("127.0.0.1:4242", "/tmp/b");
        assert_ne!(a.peer_id, b.peer_id);
    }
}
