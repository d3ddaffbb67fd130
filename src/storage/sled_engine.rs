// sled-backed persistence of node state

use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{JsonCodec, PersistAgent, StateCodec, StorageError};
use crate::raft::{NodeId, Peer, PersistentState};

const STATE_TREE: &str = "raft_state";

/// Stores one record per node id in the `raft_state` tree of a sled database.
pub struct SledPersistAgent<C = JsonCodec> {
    db: sled::Db,
    tree: sled::Tree,
    path: PathBuf,
    codec: PhantomData<C>,
}

impl<C: StateCodec> SledPersistAgent<C> {
    pub fn open(data_dir: &str) -> Result<Self, StorageError> {
        let path = PathBuf::from(data_dir);
        std::fs::create_dir_all(&path)?;

        let db = sled::open(&path)?;
        let tree = db.open_tree(STATE_TREE)?;

        log::info!("Sled persistence initialized at {:?}", path);

        Ok(Self {
            db,
            tree,
            path,
            codec: PhantomData,
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Ids of every node with a stored record.
    pub fn node_ids(&self) -> Result<Vec<NodeId>, StorageError> {
        let mut ids = Vec::new();
        for item in self.tree.iter() {
            let (key, _) = item?;
            ids.push(NodeId::from(String::from_utf8_lossy(&key).to_string()));
        }
        Ok(ids)
    }

    pub async fn close(&self) -> Result<(), StorageError> {
        self.db.flush_async().await?;
        log::info!("Sled persistence closed");
        Ok(())
    }
}

#[async_trait]
impl<T, C> PersistAgent<T> for SledPersistAgent<C>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    C: StateCodec,
{
    async fn persist(&self, node: &Peer, state: &PersistentState<T>) -> Result<(), StorageError> {
        let bytes = C::encode(state)?;
        self.tree.insert(node.id.as_str().as_bytes(), bytes)?;
        self.tree.flush_async().await?;

        log::debug!("Persisted state of node '{}' at term {}", node.id, state.term);
        Ok(())
    }

    async fn restore(&self, node: &Peer) -> Result<Option<PersistentState<T>>, StorageError> {
        match self.tree.get(node.id.as_str().as_bytes())? {
            Some(bytes) => {
                let state = C::decode(&bytes)?;
                log::debug!("Restored state of node '{}'", node.id);
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }
}
