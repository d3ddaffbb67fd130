pub mod cluster;
pub mod config;
pub mod raft;
pub mod storage;

// Public exports
pub use cluster::{ClusterError, LocalCluster};
pub use config::{Config, StorageConfig, TransportConfig};
pub use raft::{Channel, NodeId, NodeRole, Peer, Raft, RaftConfig, RaftError, RaftEvent};
pub use storage::{MemoryPersistAgent, PersistAgent, SledPersistAgent};
