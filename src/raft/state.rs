use std::fmt;

use serde::{Deserialize, Serialize};

use super::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Candidate,
    Follower,
    Leader,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRole::Candidate => "CANDIDATE",
            NodeRole::Follower => "FOLLOWER",
            NodeRole::Leader => "LEADER",
        };
        f.write_str(name)
    }
}

/// The part of a node's state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentState<T> {
    pub term: u64,
    pub voted_for: Option<NodeId>,
    pub data: T,
}
