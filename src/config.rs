use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::raft::{NodeId, Peer, RaftConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub nodes: Vec<PeerConfig>,
    pub raft: RaftConfig,
    pub storage: StorageConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl PeerConfig {
    pub fn to_peer(&self) -> Peer {
        let peer = Peer::new(NodeId::from(self.id.as_str()));
        match &self.address {
            Some(address) => peer.with_address(address.as_str()),
            None => peer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "sled")]
    Sled { data_dir: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

/// Simulated network conditions of the in-process cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub latency_ms: u64,
    /// Probability in `[0, 1]` that a message is lost.
    pub drop_rate: f64,
}

impl TransportConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: (1..=3)
                .map(|i| PeerConfig {
                    id: format!("node{i}"),
                    address: None,
                })
                .collect(),
            raft: RaftConfig::default(),
            storage: StorageConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.raft.validate()?;
        Ok(config)
    }

    pub fn peers(&self) -> Vec<Peer> {
        self.nodes.iter().map(PeerConfig::to_peer).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn storage_config_default_is_memory() {
        assert!(matches!(StorageConfig::default(), StorageConfig::Memory));
    }

    #[test]
    fn config_default_values_are_sensible() {
        let cfg = Config::default();
        assert_eq!(cfg.nodes.len(), 3);
        assert_eq!(cfg.raft, RaftConfig::default());
        assert_eq!(cfg.transport.latency(), Duration::ZERO);
        assert_eq!(cfg.peers()[0].id, NodeId::from("node1"));
    }

    #[test]
    fn from_file_reads_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "nodes": [{{"id": "a", "address": "10.0.0.1:7000"}}, {{"id": "b"}}],
                "raft": {{"heartbeat_interval": 10}},
                "storage": {{"type": "sled", "data_dir": "/tmp/raftcell"}},
                "transport": {{"latency_ms": 5}}
            }}"#
        )
        .unwrap();

        let cfg = Config::from_file(file.path()).unwrap();
        let peers = cfg.peers();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].address.as_deref(), Some("10.0.0.1:7000"));
        assert!(peers[1].address.is_none());
        assert_eq!(cfg.raft.heartbeat_interval, 10);
        assert_eq!(cfg.raft.election_timeout_min, 150);
        assert_eq!(cfg.transport.drop_rate, 0.0);
        match cfg.storage {
            StorageConfig::Sled { data_dir } => assert_eq!(data_dir, "/tmp/raftcell"),
            other => panic!("unexpected storage {other:?}"),
        }
    }

    #[test]
    fn from_file_rejects_inverted_election_bounds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"raft": {{"election_timeout_min": 500, "election_timeout_max": 100}}}}"#
        )
        .unwrap();

        assert!(Config::from_file(file.path()).is_err());
    }
}
