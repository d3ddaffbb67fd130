//! In-process cluster wiring.
//!
//! Every node gets its own bus; the cluster subscribes to the outbound
//! protocol channels of each node and re-dispatches the message on the
//! matching inbound channel of the destination. Latency, random loss and
//! partitions can be injected for testing.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, info};
use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;

use crate::config::TransportConfig;
use crate::raft::{
    BusEvent, Channel, NodeId, Peer, Raft, RaftConfig, RaftData, RaftError, RaftEvent,
};
use crate::storage::PersistAgent;

const OUTBOUND_CHANNELS: [Channel; 4] = [
    Channel::SyncData,
    Channel::DataResponse,
    Channel::VoteRequest,
    Channel::VoteResponse,
];

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error(transparent)]
    Raft(#[from] RaftError),
}

pub struct LocalCluster<T: RaftData> {
    inner: Arc<Inner<T>>,
}

impl<T: RaftData> Clone for LocalCluster<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T: RaftData> {
    config: RaftConfig,
    transport: TransportConfig,
    persist: Arc<dyn PersistAgent<T>>,
    nodes: Mutex<BTreeMap<NodeId, Raft<T>>>,
    roster: Mutex<Vec<Peer>>,
    isolated: Mutex<HashSet<NodeId>>,
}

impl<T: RaftData> LocalCluster<T> {
    pub fn new(
        config: RaftConfig,
        transport: TransportConfig,
        persist: Arc<dyn PersistAgent<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                persist,
                nodes: Mutex::new(BTreeMap::new()),
                roster: Mutex::new(Vec::new()),
                isolated: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Create every node first so that early messages find their route,
    /// then introduce each node to the others and start it.
    pub async fn create_and_start(&self, peers: Vec<Peer>) -> Result<(), ClusterError> {
        let mut created = Vec::with_capacity(peers.len());
        for peer in &peers {
            created.push(self.create_node(peer)?);
        }
        lock(&self.inner.roster).extend(peers.iter().cloned());

        for (raft, peer) in created.iter().zip(&peers) {
            for other in peers.iter().filter(|other| other.id != peer.id) {
                raft.ack_node(other.clone()).await;
            }
            raft.start(peer.clone()).await?;
        }
        info!("Local cluster started with {} nodes", peers.len());
        Ok(())
    }

    /// Join a new node to a running cluster.
    pub async fn add_node(&self, peer: Peer) -> Result<Raft<T>, ClusterError> {
        let raft = self.create_node(&peer)?;
        let others: Vec<Peer> = {
            let mut roster = lock(&self.inner.roster);
            let others = roster.clone();
            roster.push(peer.clone());
            others
        };

        for other in &others {
            raft.ack_node(other.clone()).await;
        }
        raft.start(peer.clone()).await?;

        for existing in self.nodes() {
            if existing.id().as_ref() != Some(&peer.id) {
                existing.ack_node(peer.clone()).await;
            }
        }
        info!("Node {} joined the local cluster", peer.id);
        Ok(raft)
    }

    pub async fn crash_node(&self, id: &NodeId, reason: &str) -> Result<(), ClusterError> {
        let raft = self
            .get(id)
            .ok_or_else(|| ClusterError::UnknownNode(id.clone()))?;
        raft.crash(reason).await?;
        Ok(())
    }

    /// Crash, unregister and shut down a node, then tell the survivors it
    /// is gone. Unknown ids are ignored.
    pub async fn destroy_node(&self, id: &NodeId) -> Result<(), ClusterError> {
        let Some(raft) = self.get(id) else {
            return Ok(());
        };

        raft.crash("removed!").await?;
        lock(&self.inner.nodes).remove(id);
        raft.destroy().await?;
        lock(&self.inner.isolated).remove(id);

        let departed = {
            let mut roster = lock(&self.inner.roster);
            let index = roster.iter().position(|peer| &peer.id == id);
            index.map(|index| roster.remove(index))
        };
        if let Some(departed) = departed {
            let departed = departed.departed();
            for survivor in self.nodes() {
                survivor.ack_node(departed.clone()).await;
            }
        }
        info!("Node {id} removed from the local cluster");
        Ok(())
    }

    pub async fn destroy(&self) -> Result<(), ClusterError> {
        lock(&self.inner.roster).clear();
        let nodes: Vec<Raft<T>> = {
            let mut nodes = lock(&self.inner.nodes);
            std::mem::take(&mut *nodes).into_values().collect()
        };
        for raft in nodes {
            raft.destroy().await?;
        }
        Ok(())
    }

    /// Drop every message sent to or from `id` until it is healed.
    pub fn isolate(&self, id: &NodeId) {
        lock(&self.inner.isolated).insert(id.clone());
        info!("Node {id} isolated");
    }

    pub fn heal(&self, id: &NodeId) {
        lock(&self.inner.isolated).remove(id);
        info!("Node {id} healed");
    }

    pub fn get(&self, id: &NodeId) -> Option<Raft<T>> {
        lock(&self.inner.nodes).get(id).cloned()
    }

    /// Registered nodes ordered by id.
    pub fn nodes(&self) -> Vec<Raft<T>> {
        lock(&self.inner.nodes).values().cloned().collect()
    }

    pub fn leaders(&self) -> Vec<Raft<T>> {
        self.nodes()
            .into_iter()
            .filter(|raft| raft.is_leader())
            .collect()
    }

    pub fn roster(&self) -> Vec<Peer> {
        lock(&self.inner.roster).clone()
    }

    pub fn storage(&self) -> Arc<dyn PersistAgent<T>> {
        Arc::clone(&self.inner.persist)
    }

    fn create_node(&self, peer: &Peer) -> Result<Raft<T>, ClusterError> {
        if lock(&self.inner.nodes).contains_key(&peer.id) {
            return Err(ClusterError::DuplicateNode(peer.id.clone()));
        }

        let raft = Raft::new(self.inner.config.clone(), Arc::clone(&self.inner.persist))?;
        for channel in OUTBOUND_CHANNELS {
            let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
            let sender = peer.id.clone();
            raft.subscribe(channel, move |event| {
                let weak = weak.clone();
                let sender = sender.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.deliver(&sender, event).await;
                    }
                }
            });
        }

        lock(&self.inner.nodes).insert(peer.id.clone(), raft.clone());
        Ok(raft)
    }
}

impl<T: RaftData> Inner<T> {
    async fn deliver(&self, sender: &NodeId, event: RaftEvent<T>) {
        let Some(destination) = event.destination().map(|peer| peer.id.clone()) else {
            return;
        };
        if self.is_cut(sender, &destination) || self.lost() {
            debug!("Dropped {:?} from {sender} to {destination}", event.channel());
            return;
        }

        let latency = self.transport.latency();
        if let Some(timeout) = event.timeout() {
            if latency > timeout {
                debug!("Dropped {:?} from {sender}: {latency:?} exceeds {timeout:?}", event.channel());
                return;
            }
        }
        if !latency.is_zero() {
            sleep(latency).await;
        }

        let target = lock(&self.nodes).get(&destination).cloned();
        if let (Some(target), Some(inbound)) = (target, event.into_inbound()) {
            drop(target.dispatch(inbound));
        }
    }

    fn is_cut(&self, sender: &NodeId, destination: &NodeId) -> bool {
        let isolated = lock(&self.isolated);
        isolated.contains(sender) || isolated.contains(destination)
    }

    fn lost(&self) -> bool {
        let rate = self.transport.drop_rate;
        rate > 0.0 && rand::rng().random_bool(rate.min(1.0))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
