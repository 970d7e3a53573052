//! Persisted [`NodeConfig`] singleton: created on first start, mutated only
//! by administrative operations, never destroyed (§3).

use fsyncd_core::{NodeConfig, PeerId};
use heed3::types::{Bytes, Unit};
use heed3::{Database, RoTxn, RwTxn};

use crate::error::{Result, StorageError};

const MAP_NAME: &str = "config";
const KEY: () = ();

/// Façade over the single-entry `config` map.
pub struct Config {
    map: Database<Unit, Bytes>,
}

impl Config {
    /// Opens (creating if absent) the config map.
    pub fn open(env: &heed3::Env, wtxn: &mut RwTxn<'_>) -> Result<Self> {
        let map = env
            .database_options()
            .types::<Unit, Bytes>()
            .name(MAP_NAME)
            .create(wtxn)?;
        Ok(Self { map })
    }

    /// Writes the config record. Callers enforce the create-once contract;
    /// this call itself is a plain upsert.
    pub fn put(&self, wtxn: &mut RwTxn<'_>, config: &NodeConfig) -> Result<()> {
        self.map.put(wtxn, &KEY, &encode(config))?;
        Ok(())
    }

    /// Reads the config record, if the database has been initialized.
    pub fn get(&self, rtxn: &RoTxn<'_>) -> Result<Option<NodeConfig>> {
        match self.map.get(rtxn, &KEY)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }
}

fn encode(config: &NodeConfig) -> Vec<u8> {
    let address = config.listen_address.as_bytes();
    let root = config.sync_root.to_string_lossy();
    let root = root.as_bytes();
    let mut buf = Vec::with_capacity(16 + 4 + address.len() + 4 + root.len());
    buf.extend_from_slice(config.peer_id.as_bytes());
    buf.extend_from_slice(&(address.len() as u32).to_be_bytes());
    buf.extend_from_slice(address);
    buf.extend_from_slice(&(root.len() as u32).to_be_bytes());
    buf.extend_from_slice(root);
    buf
}

fn decode(bytes: &[u8]) -> Result<NodeConfig> {
    if bytes.len() < 20 {
        return Err(StorageError::Corrupt("truncated config record".to_owned()));
    }
    let mut peer_bytes = [0u8; 16];
    peer_bytes.copy_from_slice(&bytes[0..16]);
    let peer_id = PeerId::from_bytes(peer_bytes);

    let addr_len = u32::from_be_bytes(bytes[16..20].try_into().unwrap()) as usize;
    let addr_start = 20;
    let addr_end = addr_start + addr_len;
    let listen_address = String::from_utf8(bytes[addr_start..addr_end].to_vec())
        .map_err(|e| StorageError::Corrupt(e.to_string()))?;

    let root_len_start = addr_end;
    let root_len = u32::from_be_bytes(
        bytes[root_len_start..root_len_start + 4].try_into().unwrap(),
    ) as usize;
    let root_start = root_len_start + 4;
    let root_end = root_start + root_len;
    let sync_root = String::from_utf8(bytes[root_start..root_end].to_vec())
        .map_err(|e| StorageError::Corrupt(e.to_string()))?
        .into();

    Ok(NodeConfig { peer_id, listen_address, sync_root })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Storage;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(dir.path()).expect("open");
        let mut wtxn = storage.write_txn().expect("wtxn");
        let config_map = Config::open(storage.env(), &mut wtxn).expect("open config");

        let config = NodeConfig::new("0.0.0.0:4242", "/sync/root");
        config_map.put(&mut wtxn, &config).unwrap();
        assert_eq!(config_map.get(&wtxn).unwrap(), Some(config));
        wtxn.commit().unwrap();
    }
}
