use std::collections::HashSet;
use std::time::Duration;

use log::{debug, info};

use super::{
    DataAck, DataSync, NodeId, NodeRole, PersistentState, Peer, RaftConfig, RaftError, RaftEvent,
    VoteRequest, VoteResponse,
};

/// What the election timer should do once a transition is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerAction {
    #[default]
    Keep,
    Rearm,
    Cancel,
}

/// Side effects produced by one state transition.
#[derive(Debug)]
pub struct Transition<T> {
    pub events: Vec<RaftEvent<T>>,
    pub timer: TimerAction,
    /// Schedule the delayed self-promotion of a node that has no peers.
    pub bootstrap: bool,
}

impl<T> Default for Transition<T> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            timer: TimerAction::Keep,
            bootstrap: false,
        }
    }
}

impl<T> Transition<T> {
    /// Outbound protocol messages, skipping log and role notifications.
    pub fn messages(&self) -> impl Iterator<Item = &RaftEvent<T>> {
        self.events.iter().filter(|e| e.destination().is_some())
    }
}

/// Consensus state machine of one node.
///
/// Every handler runs to completion synchronously and reports its side
/// effects as a [`Transition`]; the async service in `raft::Raft` performs
/// them. Nothing here awaits, so a handler can never observe another
/// handler's half-applied state.
pub struct RaftNode<T> {
    node: Option<Peer>,
    state: PersistentState<T>,
    role: NodeRole,
    prev_role: NodeRole,
    leader: Option<NodeId>,
    followers: Vec<Peer>,
    received_votes: HashSet<NodeId>,
    request_timeout: Duration,
}

impl<T: Clone + Default> RaftNode<T> {
    pub fn new(config: &RaftConfig) -> Self {
        Self {
            node: None,
            state: PersistentState::default(),
            role: NodeRole::Follower,
            prev_role: NodeRole::Follower,
            leader: None,
            followers: Vec::new(),
            received_votes: HashSet::new(),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn node(&self) -> Option<&Peer> {
        self.node.as_ref()
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.role, NodeRole::Leader)
    }

    pub fn leader(&self) -> Option<&NodeId> {
        self.leader.as_ref()
    }

    pub fn followers(&self) -> &[Peer] {
        &self.followers
    }

    pub fn state(&self) -> &PersistentState<T> {
        &self.state
    }

    pub fn term(&self) -> u64 {
        self.state.term
    }

    pub fn voted_for(&self) -> Option<&NodeId> {
        self.state.voted_for.as_ref()
    }

    pub fn data(&self) -> &T {
        &self.state.data
    }

    pub fn votes(&self) -> usize {
        self.received_votes.len()
    }

    /// Join the cluster as `node`, starting from `restored` or a blank state.
    pub fn boot(&mut self, node: Peer, restored: Option<PersistentState<T>>) -> Transition<T> {
        let mut out = Transition::default();
        self.state = restored.unwrap_or_default();
        self.node = Some(node);
        self.leader = None;
        self.role = NodeRole::Follower;
        self.received_votes.clear();
        self.log(&mut out, "raft started".to_string());
        out.timer = TimerAction::Rearm;
        out
    }

    /// Election timer callback. Leaders ignore it.
    pub fn election_timeout(&mut self) -> Transition<T> {
        if self.node.is_none() || self.is_leader() {
            return Transition::default();
        }
        self.start_election()
    }

    pub fn start_election(&mut self) -> Transition<T> {
        let mut out = Transition::default();
        let Some(me) = self.node.clone() else {
            return out;
        };

        if self.followers.is_empty() {
            self.log(&mut out, "election has no candidates".to_string());
            self.role = NodeRole::Candidate;
            self.inform_update(&mut out);
            out.bootstrap = true;
            return out;
        }

        self.log(
            &mut out,
            format!("election started between {} nodes", self.followers.len()),
        );
        self.state.term += 1;
        self.state.voted_for = Some(me.id.clone());
        self.role = NodeRole::Candidate;
        self.inform_update(&mut out);
        self.received_votes.clear();
        self.received_votes.insert(me.id.clone());

        for follower in &self.followers {
            out.events.push(RaftEvent::VoteRequest(VoteRequest {
                destination: follower.clone(),
                timeout: self.request_timeout,
                candidate: me.clone(),
                term: self.state.term,
            }));
        }
        out.timer = TimerAction::Rearm;
        out
    }

    /// Second half of the no-peer election: lead alone.
    pub fn complete_bootstrap(&mut self) -> Transition<T> {
        let mut out = Transition::default();
        let Some(me) = self.node.clone() else {
            return out;
        };
        self.role = NodeRole::Leader;
        self.inform_update(&mut out);
        self.leader = Some(me.id.clone());
        self.state.voted_for = Some(me.id);
        out
    }

    pub fn vote_request_received(&mut self, vote: VoteRequest) -> Transition<T> {
        let mut out = Transition::default();
        let Some(me) = self.node.clone() else {
            return out;
        };

        if vote.term > self.state.term {
            self.state.term = vote.term;
            self.role = NodeRole::Follower;
            self.inform_update(&mut out);
            self.state.voted_for = None;
        }

        let granted = vote.term == self.state.term
            && self
                .state
                .voted_for
                .as_ref()
                .map_or(true, |voted| *voted == vote.candidate.id);

        if granted {
            self.state.voted_for = Some(vote.candidate.id.clone());
        }
        debug!(
            "[{}] vote for {} in term {}: granted={granted}",
            me.id, vote.candidate.id, vote.term
        );

        out.events.push(RaftEvent::VoteResponse(VoteResponse {
            destination: vote.candidate,
            timeout: self.request_timeout,
            voter: me,
            term: self.state.term,
            granted,
        }));
        out
    }

    pub fn vote_response_received(&mut self, vote: VoteResponse) -> Transition<T> {
        let mut out = Transition::default();
        let Some(me) = self.node.clone() else {
            return out;
        };

        if vote.term == self.state.term && self.role == NodeRole::Candidate && vote.granted {
            self.received_votes.insert(vote.voter.id);
            let cluster_size = self.followers.len() + 1;
            if 2 * self.received_votes.len() > cluster_size {
                self.role = NodeRole::Leader;
                self.inform_update(&mut out);
                self.leader = Some(me.id);
                out.timer = TimerAction::Cancel;
                return out;
            }
        } else if vote.term > self.state.term {
            self.log(
                &mut out,
                "let's step down and be a follower for a while".to_string(),
            );
            self.state.term = vote.term;
            self.role = NodeRole::Follower;
            self.inform_update(&mut out);
            self.state.voted_for = None;
        }
        out.timer = TimerAction::Rearm;
        out
    }

    pub fn data_received(&mut self, sync: DataSync<T>) -> Transition<T> {
        let mut out = Transition::default();
        let Some(me) = self.node.clone() else {
            return out;
        };

        let mut canceled = false;
        if sync.term > self.state.term {
            self.state.term = sync.term;
            self.state.voted_for = None;
            out.timer = TimerAction::Cancel;
            canceled = true;
        }

        if sync.term == self.state.term {
            self.role = NodeRole::Follower;
            self.inform_update(&mut out);
            self.leader = Some(sync.node.id.clone());
            self.state.data = sync.data;
            out.events.push(RaftEvent::DataResponse(DataAck {
                destination: sync.node,
                timeout: self.request_timeout,
                node: me,
                term: self.state.term,
                success: true,
            }));
            if !canceled {
                out.timer = TimerAction::Rearm;
            }
        } else {
            self.log(
                &mut out,
                format!(
                    "rejecting stale heartbeat from {} (term {} < {})",
                    sync.node.id, sync.term, self.state.term
                ),
            );
            out.events.push(RaftEvent::DataResponse(DataAck {
                destination: sync.node,
                timeout: self.request_timeout,
                node: me,
                term: self.state.term,
                success: false,
            }));
            out.timer = TimerAction::Rearm;
        }
        out
    }

    pub fn data_response_received(&mut self, ack: DataAck) -> Transition<T> {
        let mut out = Transition::default();
        if ack.term > self.state.term {
            self.state.term = ack.term;
            self.role = NodeRole::Follower;
            self.inform_update(&mut out);
            self.state.voted_for = None;
            out.timer = TimerAction::Cancel;
        } else if ack.term == self.state.term {
            out.timer = TimerAction::Rearm;
        }
        out
    }

    /// A bare log line, no state change.
    pub fn notice(&self, message: &str) -> Transition<T> {
        let mut out = Transition::default();
        self.log(&mut out, message.to_string());
        out
    }

    /// Log line emitted before a crash flushes state.
    pub fn crash_notice(&self, reason: &str) -> Transition<T> {
        self.notice(&format!("raft crashed: {reason}"))
    }

    /// State reset applied once a crash has flushed persisted state.
    pub fn crashed(&mut self) -> Transition<T> {
        let mut out = Transition::default();
        self.role = NodeRole::Follower;
        self.inform_update(&mut out);
        self.state.voted_for = None;
        self.leader = None;
        out.timer = TimerAction::Rearm;
        out
    }

    /// Apply a membership feed update for `node`.
    pub fn ack_node(&mut self, node: Peer) -> Transition<T> {
        let mut out = Transition::default();
        let index = self.followers.iter().position(|f| f.id == node.id);

        match (index, node.is_alive()) {
            (Some(index), false) => {
                self.followers.remove(index);
                self.log(&mut out, format!("raft node destroyed: {}", node.id));
            }
            (Some(index), true) => {
                self.followers[index] = node;
            }
            (None, true) => {
                let id = node.id.clone();
                self.followers.push(node);
                self.log(&mut out, format!("raft node added: {id}"));
            }
            (None, false) => {}
        }
        out
    }

    /// Overwrite the value locally. Followers pick it up from the next
    /// heartbeat; there is no commit round.
    pub fn replicate(&mut self, data: T) -> Result<(), RaftError> {
        if !self.is_leader() {
            return Err(RaftError::NotLeader);
        }
        self.state.data = data;
        Ok(())
    }

    /// Heartbeats for every follower, empty unless leading.
    pub fn heartbeat(&self) -> Vec<RaftEvent<T>> {
        let Some(me) = self.node.as_ref() else {
            return Vec::new();
        };
        if !self.is_leader() {
            return Vec::new();
        }
        self.followers
            .iter()
            .map(|follower| {
                RaftEvent::SyncData(DataSync {
                    destination: follower.clone(),
                    timeout: self.request_timeout,
                    node: me.clone(),
                    term: self.state.term,
                    data: self.state.data.clone(),
                })
            })
            .collect()
    }

    fn inform_update(&mut self, out: &mut Transition<T>) {
        if self.prev_role != self.role {
            self.log(out, format!("node become {}", self.role));
            out.events.push(RaftEvent::RoleChanged(self.role));
            self.prev_role = self.role;
        }
    }

    fn log(&self, out: &mut Transition<T>, message: String) {
        match &self.node {
            Some(node) => info!("[{}] {message}", node.id),
            None => info!("{message}"),
        }
        out.events.push(RaftEvent::Log { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RaftConfig {
        RaftConfig::new(10, 100, 200)
    }

    /// Node "a" booted with peers "b", "c", "d".
    fn cluster_node() -> RaftNode<String> {
        let mut node = RaftNode::new(&config());
        for id in ["b", "c", "d"] {
            node.ack_node(Peer::new(id));
        }
        node.boot(Peer::new("a"), None);
        node
    }

    fn restored(term: u64, voted_for: Option<&str>, data: &str) -> PersistentState<String> {
        PersistentState {
            term,
            voted_for: voted_for.map(NodeId::from),
            data: data.to_string(),
        }
    }

    fn vote_request(candidate: &str, term: u64) -> VoteRequest {
        VoteRequest {
            destination: Peer::new("a"),
            timeout: Duration::from_millis(50),
            candidate: Peer::new(candidate),
            term,
        }
    }

    fn vote_response(voter: &str, term: u64, granted: bool) -> VoteResponse {
        VoteResponse {
            destination: Peer::new("a"),
            timeout: Duration::from_millis(50),
            voter: Peer::new(voter),
            term,
            granted,
        }
    }

    fn sync(from: &str, term: u64, data: &str) -> DataSync<String> {
        DataSync {
            destination: Peer::new("a"),
            timeout: Duration::from_millis(50),
            node: Peer::new(from),
            term,
            data: data.to_string(),
        }
    }

    fn ack(from: &str, term: u64) -> DataAck {
        DataAck {
            destination: Peer::new("a"),
            timeout: Duration::from_millis(50),
            node: Peer::new(from),
            term,
            success: true,
        }
    }

    fn only_vote_response<T>(out: &Transition<T>) -> &VoteResponse {
        let responses: Vec<_> = out
            .events
            .iter()
            .filter_map(|e| match e {
                RaftEvent::VoteResponse(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(responses.len(), 1);
        responses[0]
    }

    fn only_data_ack<T>(out: &Transition<T>) -> &DataAck {
        let acks: Vec<_> = out
            .events
            .iter()
            .filter_map(|e| match e {
                RaftEvent::DataResponse(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(acks.len(), 1);
        acks[0]
    }

    fn role_changes<T>(out: &Transition<T>) -> Vec<NodeRole> {
        out.events
            .iter()
            .filter_map(|e| match e {
                RaftEvent::RoleChanged(role) => Some(*role),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn boot_defaults_or_restores_state() {
        let mut node: RaftNode<String> = RaftNode::new(&config());
        let out = node.boot(Peer::new("a"), None);
        assert_eq!(out.timer, TimerAction::Rearm);
        assert_eq!(node.term(), 0);
        assert!(node.voted_for().is_none());
        assert_eq!(node.data(), "");
        assert_eq!(node.role(), NodeRole::Follower);

        let out = node.boot(Peer::new("a"), Some(restored(4, Some("b"), "v")));
        assert_eq!(out.timer, TimerAction::Rearm);
        assert_eq!(node.term(), 4);
        assert_eq!(node.voted_for(), Some(&NodeId::from("b")));
        assert_eq!(node.data(), "v");
    }

    #[test]
    fn election_requests_votes_from_every_follower() {
        let mut node = cluster_node();
        let out = node.election_timeout();

        assert_eq!(node.term(), 1);
        assert_eq!(node.role(), NodeRole::Candidate);
        assert_eq!(node.voted_for(), Some(&NodeId::from("a")));
        assert_eq!(node.votes(), 1);
        assert_eq!(out.timer, TimerAction::Rearm);
        assert!(!out.bootstrap);
        assert_eq!(role_changes(&out), vec![NodeRole::Candidate]);

        let mut targets: Vec<_> = out
            .messages()
            .map(|e| match e {
                RaftEvent::VoteRequest(r) => {
                    assert_eq!(r.term, 1);
                    assert_eq!(r.candidate.id, NodeId::from("a"));
                    assert_eq!(r.timeout, Duration::from_millis(50));
                    r.destination.id.to_string()
                }
                other => panic!("unexpected message {other:?}"),
            })
            .collect();
        targets.sort();
        assert_eq!(targets, vec!["b", "c", "d"]);
    }

    #[test]
    fn lone_node_becomes_candidate_then_bootstraps_to_leader() {
        let mut node: RaftNode<String> = RaftNode::new(&config());
        node.boot(Peer::new("solo"), None);

        let out = node.election_timeout();
        assert!(out.bootstrap);
        assert_eq!(out.timer, TimerAction::Keep);
        assert_eq!(out.messages().count(), 0);
        assert_eq!(node.role(), NodeRole::Candidate);
        assert_eq!(node.term(), 0);

        let out = node.complete_bootstrap();
        assert_eq!(role_changes(&out), vec![NodeRole::Leader]);
        assert!(node.is_leader());
        assert_eq!(node.leader(), Some(&NodeId::from("solo")));
        assert_eq!(node.voted_for(), Some(&NodeId::from("solo")));
    }

    #[test]
    fn leader_ignores_election_timeout() {
        let mut node = cluster_node();
        node.election_timeout();
        node.vote_response_received(vote_response("b", 1, true));
        node.vote_response_received(vote_response("c", 1, true));
        assert!(node.is_leader());

        let out = node.election_timeout();
        assert!(out.events.is_empty());
        assert_eq!(node.term(), 1);
    }

    #[test]
    fn candidate_needs_strict_majority() {
        let mut node = cluster_node();
        node.election_timeout();

        // 2 of 4 is not a majority.
        let out = node.vote_response_received(vote_response("b", 1, true));
        assert_eq!(node.role(), NodeRole::Candidate);
        assert_eq!(out.timer, TimerAction::Rearm);

        // A duplicate response does not count twice.
        node.vote_response_received(vote_response("b", 1, true));
        assert_eq!(node.role(), NodeRole::Candidate);
        assert_eq!(node.votes(), 2);

        let out = node.vote_response_received(vote_response("c", 1, true));
        assert!(node.is_leader());
        assert_eq!(node.leader(), Some(&NodeId::from("a")));
        assert_eq!(out.timer, TimerAction::Cancel);
        assert_eq!(role_changes(&out), vec![NodeRole::Leader]);
    }

    #[test]
    fn rejected_or_stale_votes_rearm_without_counting() {
        let mut node = cluster_node();
        node.election_timeout();

        let out = node.vote_response_received(vote_response("b", 1, false));
        assert_eq!(out.timer, TimerAction::Rearm);
        let out = node.vote_response_received(vote_response("c", 0, true));
        assert_eq!(out.timer, TimerAction::Rearm);
        assert_eq!(node.votes(), 1);
        assert_eq!(node.role(), NodeRole::Candidate);
    }

    #[test]
    fn higher_term_vote_response_steps_down() {
        let mut node = cluster_node();
        node.election_timeout();

        let out = node.vote_response_received(vote_response("b", 7, false));
        assert_eq!(node.term(), 7);
        assert_eq!(node.role(), NodeRole::Follower);
        assert!(node.voted_for().is_none());
        assert_eq!(out.timer, TimerAction::Rearm);
        assert_eq!(role_changes(&out), vec![NodeRole::Follower]);
    }

    #[test]
    fn grants_one_candidate_per_term() {
        let mut node = cluster_node();

        let out = node.vote_request_received(vote_request("b", 1));
        let response = only_vote_response(&out);
        assert!(response.granted);
        assert_eq!(response.term, 1);
        assert_eq!(response.destination.id, NodeId::from("b"));
        assert_eq!(out.timer, TimerAction::Keep);

        // Same candidate again is fine.
        let out = node.vote_request_received(vote_request("b", 1));
        assert!(only_vote_response(&out).granted);

        let out = node.vote_request_received(vote_request("c", 1));
        assert!(!only_vote_response(&out).granted);
        assert_eq!(node.voted_for(), Some(&NodeId::from("b")));
    }

    #[test]
    fn higher_term_request_clears_previous_vote() {
        let mut node = cluster_node();
        node.vote_request_received(vote_request("b", 1));

        let out = node.vote_request_received(vote_request("c", 2));
        assert!(only_vote_response(&out).granted);
        assert_eq!(node.term(), 2);
        assert_eq!(node.voted_for(), Some(&NodeId::from("c")));
    }

    #[test]
    fn stale_vote_request_is_refused() {
        let mut node: RaftNode<String> = RaftNode::new(&config());
        node.ack_node(Peer::new("b"));
        node.boot(Peer::new("a"), Some(restored(5, Some("a"), "")));

        let out = node.vote_request_received(vote_request("b", 4));
        let response = only_vote_response(&out);
        assert!(!response.granted);
        assert_eq!(response.term, 5);
        assert_eq!(node.term(), 5);
        assert_eq!(node.voted_for(), Some(&NodeId::from("a")));
    }

    #[test]
    fn heartbeat_overwrites_value_and_follows_sender() {
        let mut node = cluster_node();
        node.election_timeout();
        let out = node.data_received(sync("b", 1, "hello"));

        assert_eq!(node.role(), NodeRole::Follower);
        assert_eq!(node.leader(), Some(&NodeId::from("b")));
        assert_eq!(node.data(), "hello");
        assert_eq!(out.timer, TimerAction::Rearm);
        let ack = only_data_ack(&out);
        assert!(ack.success);
        assert_eq!(ack.destination.id, NodeId::from("b"));
    }

    #[test]
    fn newer_term_heartbeat_adopts_term_and_leaves_timer_cancelled() {
        let mut node = cluster_node();
        node.vote_request_received(vote_request("b", 1));

        let out = node.data_received(sync("c", 3, "x"));
        assert_eq!(node.term(), 3);
        assert!(node.voted_for().is_none());
        assert_eq!(node.data(), "x");
        assert_eq!(out.timer, TimerAction::Cancel);
        assert!(only_data_ack(&out).success);
    }

    #[test]
    fn stale_heartbeat_is_rejected() {
        let mut node: RaftNode<String> = RaftNode::new(&config());
        node.ack_node(Peer::new("b"));
        node.boot(Peer::new("a"), Some(restored(5, None, "mine")));

        let out = node.data_received(sync("b", 3, "theirs"));
        let ack = only_data_ack(&out);
        assert!(!ack.success);
        assert_eq!(ack.term, 5);
        assert_eq!(node.data(), "mine");
        assert_eq!(node.term(), 5);
        assert_eq!(out.timer, TimerAction::Rearm);
    }

    #[test]
    fn data_acks_drive_leader_timer_and_step_down() {
        let mut node = cluster_node();
        node.election_timeout();
        node.vote_response_received(vote_response("b", 1, true));
        node.vote_response_received(vote_response("c", 1, true));
        assert!(node.is_leader());

        assert_eq!(node.data_response_received(ack("b", 1)).timer, TimerAction::Rearm);
        assert_eq!(node.data_response_received(ack("b", 0)).timer, TimerAction::Keep);

        let out = node.data_response_received(ack("d", 4));
        assert_eq!(out.timer, TimerAction::Cancel);
        assert_eq!(node.term(), 4);
        assert_eq!(node.role(), NodeRole::Follower);
        assert!(node.voted_for().is_none());
    }

    #[test]
    fn crash_resets_role_vote_and_leader() {
        let mut node = cluster_node();
        node.election_timeout();
        node.vote_response_received(vote_response("b", 1, true));
        node.vote_response_received(vote_response("c", 1, true));

        let notice = node.crash_notice("manual crash!");
        assert!(matches!(
            &notice.events[..],
            [RaftEvent::Log { message }] if message.contains("manual crash!")
        ));

        let out = node.crashed();
        assert_eq!(node.role(), NodeRole::Follower);
        assert!(node.voted_for().is_none());
        assert!(node.leader().is_none());
        assert_eq!(node.term(), 1);
        assert_eq!(out.timer, TimerAction::Rearm);
        assert_eq!(role_changes(&out), vec![NodeRole::Follower]);
    }

    #[test]
    fn role_notifications_are_not_repeated() {
        let mut node = cluster_node();
        let out = node.data_received(sync("b", 0, "v"));
        assert!(role_changes(&out).is_empty());

        node.election_timeout();
        let out = node.election_timeout();
        assert!(role_changes(&out).is_empty(), "still candidate");
    }

    #[test]
    fn ack_node_adds_updates_removes_and_ignores() {
        let mut node: RaftNode<String> = RaftNode::new(&config());

        node.ack_node(Peer::new("ghost").with_time(0));
        assert!(node.followers().is_empty());

        node.ack_node(Peer::new("b"));
        assert_eq!(node.followers().len(), 1);

        node.ack_node(Peer::new("b").with_address("10.0.0.2:7000").with_time(9));
        assert_eq!(node.followers().len(), 1);
        assert_eq!(node.followers()[0].time, Some(9));
        assert_eq!(node.followers()[0].address.as_deref(), Some("10.0.0.2:7000"));

        node.ack_node(Peer::new("c"));
        node.ack_node(Peer::new("b").departed());
        let ids: Vec<_> = node.followers().iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn only_leader_accepts_values_and_sends_heartbeats() {
        let mut node = cluster_node();
        assert!(matches!(node.replicate("v".into()), Err(RaftError::NotLeader)));
        assert!(node.heartbeat().is_empty());

        node.election_timeout();
        node.vote_response_received(vote_response("b", 1, true));
        node.vote_response_received(vote_response("c", 1, true));
        node.replicate("v".into()).expect("leader accepts values");

        let beats = node.heartbeat();
        assert_eq!(beats.len(), 3);
        for beat in beats {
            match beat {
                RaftEvent::SyncData(sync) => {
                    assert_eq!(sync.term, 1);
                    assert_eq!(sync.data, "v");
                    assert_eq!(sync.node.id, NodeId::from("a"));
                }
                other => panic!("unexpected heartbeat {other:?}"),
            }
        }
    }
}
