use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::bus::BusEvent;
use super::state::NodeRole;

/// Opaque, comparable node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id.to_string())
    }
}

/// A cluster member as seen by one node.
///
/// `time` is the liveness marker fed by the membership source: absent or zero
/// means the peer is gone, anything else means it is alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: NodeId,
    pub address: Option<String>,
    pub time: Option<u64>,
}

impl Peer {
    /// A live peer with no transport address.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            address: None,
            time: Some(1),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = Some(time);
        self
    }

    /// The same peer marked as no longer alive.
    pub fn departed(&self) -> Self {
        Self {
            time: None,
            ..self.clone()
        }
    }

    pub fn is_alive(&self) -> bool {
        self.time.is_some_and(|t| t != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRequest {
    pub destination: Peer,
    pub timeout: Duration,
    pub candidate: Peer,
    pub term: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteResponse {
    pub destination: Peer,
    pub timeout: Duration,
    pub voter: Peer,
    pub term: u64,
    pub granted: bool,
}

/// Leader heartbeat that also carries the whole replicated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSync<T> {
    pub destination: Peer,
    pub timeout: Duration,
    pub node: Peer,
    pub term: u64,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAck {
    pub destination: Peer,
    pub timeout: Duration,
    pub node: Peer,
    pub term: u64,
    pub success: bool,
}

/// Channel tags of [`RaftEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    ServiceStarted,
    ServiceCrashed,
    ReplicateData,
    SyncData,
    DataReceived,
    DataResponse,
    DataResponseReceived,
    VoteRequest,
    VoteRequestReceived,
    VoteResponse,
    VoteResponseReceived,
    RoleChanged,
    AckNode,
    Log,
}

/// Everything that travels over a node's event bus.
///
/// Outbound protocol messages use the plain variants (`SyncData`,
/// `DataResponse`, `VoteRequest`, `VoteResponse`); a transport re-delivers
/// them to the destination as the matching `*Received` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RaftEvent<T> {
    ServiceStarted { node: Peer },
    ServiceCrashed { reason: String },
    ReplicateData(T),
    SyncData(DataSync<T>),
    DataReceived(DataSync<T>),
    DataResponse(DataAck),
    DataResponseReceived(DataAck),
    VoteRequest(VoteRequest),
    VoteRequestReceived(VoteRequest),
    VoteResponse(VoteResponse),
    VoteResponseReceived(VoteResponse),
    RoleChanged(NodeRole),
    AckNode(Peer),
    Log { message: String },
}

impl<T> RaftEvent<T> {
    /// Destination of an outbound protocol message.
    pub fn destination(&self) -> Option<&Peer> {
        match self {
            RaftEvent::SyncData(m) | RaftEvent::DataReceived(m) => Some(&m.destination),
            RaftEvent::DataResponse(m) | RaftEvent::DataResponseReceived(m) => {
                Some(&m.destination)
            }
            RaftEvent::VoteRequest(m) | RaftEvent::VoteRequestReceived(m) => Some(&m.destination),
            RaftEvent::VoteResponse(m) | RaftEvent::VoteResponseReceived(m) => {
                Some(&m.destination)
            }
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self {
            RaftEvent::SyncData(m) | RaftEvent::DataReceived(m) => Some(m.timeout),
            RaftEvent::DataResponse(m) | RaftEvent::DataResponseReceived(m) => Some(m.timeout),
            RaftEvent::VoteRequest(m) | RaftEvent::VoteRequestReceived(m) => Some(m.timeout),
            RaftEvent::VoteResponse(m) | RaftEvent::VoteResponseReceived(m) => Some(m.timeout),
            _ => None,
        }
    }

    /// Turn an outbound protocol message into what its destination receives.
    pub fn into_inbound(self) -> Option<RaftEvent<T>> {
        match self {
            RaftEvent::SyncData(m) => Some(RaftEvent::DataReceived(m)),
            RaftEvent::DataResponse(m) => Some(RaftEvent::DataResponseReceived(m)),
            RaftEvent::VoteRequest(m) => Some(RaftEvent::VoteRequestReceived(m)),
            RaftEvent::VoteResponse(m) => Some(RaftEvent::VoteResponseReceived(m)),
            _ => None,
        }
    }
}

impl<T: Clone + Send + 'static> BusEvent for RaftEvent<T> {
    type Channel = Channel;

    fn channel(&self) -> Channel {
        match self {
            RaftEvent::ServiceStarted { .. } => Channel::ServiceStarted,
            RaftEvent::ServiceCrashed { .. } => Channel::ServiceCrashed,
            RaftEvent::ReplicateData(_) => Channel::ReplicateData,
            RaftEvent::SyncData(_) => Channel::SyncData,
            RaftEvent::DataReceived(_) => Channel::DataReceived,
            RaftEvent::DataResponse(_) => Channel::DataResponse,
            RaftEvent::DataResponseReceived(_) => Channel::DataResponseReceived,
            RaftEvent::VoteRequest(_) => Channel::VoteRequest,
            RaftEvent::VoteRequestReceived(_) => Channel::VoteRequestReceived,
            RaftEvent::VoteResponse(_) => Channel::VoteResponse,
            RaftEvent::VoteResponseReceived(_) => Channel::VoteResponseReceived,
            RaftEvent::RoleChanged(_) => Channel::RoleChanged,
            RaftEvent::AckNode(_) => Channel::AckNode,
            RaftEvent::Log { .. } => Channel::Log,
        }
    }
}
