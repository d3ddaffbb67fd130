mod codec;
mod error;
mod memory;
mod sled_engine;

use async_trait::async_trait;

use crate::raft::{Peer, PersistentState};

pub use self::codec::{BincodeCodec, JsonCodec, StateCodec};
pub use self::error::StorageError;
pub use self::memory::MemoryPersistAgent;
pub use self::sled_engine::SledPersistAgent;

/// Durable home of each node's [`PersistentState`], keyed by node identity.
///
/// The engine calls `restore` once on boot and `persist` on crash simulation
/// and graceful shutdown. Errors are handed back to whoever triggered those
/// lifecycle commands; the engine never retries.
#[async_trait]
pub trait PersistAgent<T>: Send + Sync {
    async fn persist(&self, node: &Peer, state: &PersistentState<T>) -> Result<(), StorageError>;

    async fn restore(&self, node: &Peer) -> Result<Option<PersistentState<T>>, StorageError>;
}
