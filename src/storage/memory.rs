//! In-memory persistence for tests and the demo cluster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{PersistAgent, StorageError};
use crate::raft::{NodeId, Peer, PersistentState};

/// Shared map of node records. Clones see the same records, so one agent can
/// serve a whole in-process cluster and still be inspected from outside.
pub struct MemoryPersistAgent<T> {
    records: Arc<Mutex<HashMap<NodeId, PersistentState<T>>>>,
}

impl<T> Clone for MemoryPersistAgent<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<T> Default for MemoryPersistAgent<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryPersistAgent<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> MemoryPersistAgent<T> {
    pub fn get(&self, id: &NodeId) -> Option<PersistentState<T>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl<T> PersistAgent<T> for MemoryPersistAgent<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn persist(&self, node: &Peer, state: &PersistentState<T>) -> Result<(), StorageError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.id.clone(), state.clone());
        Ok(())
    }

    async fn restore(&self, node: &Peer) -> Result<Option<PersistentState<T>>, StorageError> {
        Ok(self.get(&node.id))
    }
}
