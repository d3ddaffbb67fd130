mod bus;
mod config;
mod error;
mod message;
mod node;
mod state;
mod timer;

pub use self::bus::{BusEvent, EventBus, Subscription};
pub use self::config::RaftConfig;
pub use self::error::RaftError;
pub use self::message::{
    Channel, DataAck, DataSync, NodeId, Peer, RaftEvent, VoteRequest, VoteResponse,
};
pub use self::node::{RaftNode, TimerAction, Transition};
pub use self::state::{NodeRole, PersistentState};
pub use self::timer::CancelableTimer;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use log::{debug, error, info};

use crate::storage::PersistAgent;

/// Bounds every replicated value type has to meet.
pub trait RaftData: Clone + Default + Send + Sync + 'static {}

impl<T: Clone + Default + Send + Sync + 'static> RaftData for T {}

/// Inbound protocol channels, re-subscribed on every boot.
const PROTOCOL_CHANNELS: [Channel; 4] = [
    Channel::VoteRequestReceived,
    Channel::VoteResponseReceived,
    Channel::DataReceived,
    Channel::DataResponseReceived,
];

/// Handle to one consensus node.
///
/// Lifecycle commands can be issued through the methods here or by
/// dispatching the matching [`RaftEvent`] on the node's bus. Cloning is cheap
/// and every clone drives the same node.
pub struct Raft<T: RaftData> {
    shared: Arc<Shared<T>>,
}

impl<T: RaftData> Clone for Raft<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T: RaftData> {
    this: Weak<Shared<T>>,
    config: RaftConfig,
    persist: Arc<dyn PersistAgent<T>>,
    bus: EventBus<RaftEvent<T>>,
    node: Mutex<RaftNode<T>>,
    election_timer: CancelableTimer,
    ticker: Mutex<Option<JoinHandle<()>>>,
    background: Mutex<Vec<JoinHandle<()>>>,
    /// Cleared by `destroy`; timer and bootstrap callbacks already in
    /// flight check it before touching the node.
    running: AtomicBool,
}

impl<T: RaftData> Raft<T> {
    pub fn new(config: RaftConfig, persist: Arc<dyn PersistAgent<T>>) -> Result<Self, RaftError> {
        config.validate()?;
        let (min, max) = config.election_timeout_bounds();

        let shared = Arc::new_cyclic(|this: &Weak<Shared<T>>| {
            let weak = this.clone();
            let election_timer = CancelableTimer::new(
                move || {
                    let weak = weak.clone();
                    async move {
                        if let Some(shared) = weak.upgrade() {
                            shared.on_election_timeout().await;
                        }
                    }
                },
                min,
                max,
            );

            Shared {
                this: this.clone(),
                node: Mutex::new(RaftNode::new(&config)),
                config,
                persist,
                bus: EventBus::new(),
                election_timer,
                ticker: Mutex::new(None),
                background: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
            }
        });

        shared.listen(Channel::ServiceStarted, |shared, event| async move {
            if let RaftEvent::ServiceStarted { node } = event {
                if let Err(e) = shared.start(node).await {
                    error!("Failed to start raft node: {e}");
                }
            }
        });
        shared.listen(Channel::ServiceCrashed, |shared, event| async move {
            if let RaftEvent::ServiceCrashed { reason } = event {
                if let Err(e) = shared.crash(&reason).await {
                    error!("Failed to flush state on crash: {e}");
                }
            }
        });
        shared.listen(Channel::AckNode, |shared, event| async move {
            if let RaftEvent::AckNode(node) = event {
                shared.ack_node(node).await;
            }
        });

        info!("raft initialized");
        Ok(Self { shared })
    }

    pub fn config(&self) -> &RaftConfig {
        &self.shared.config
    }

    pub fn bus(&self) -> &EventBus<RaftEvent<T>> {
        &self.shared.bus
    }

    pub fn subscribe<F, Fut>(&self, channel: Channel, handler: F) -> Subscription
    where
        F: Fn(RaftEvent<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shared.bus.subscribe(channel, handler)
    }

    pub fn dispatch(&self, event: RaftEvent<T>) -> impl Future<Output = ()> + Send + 'static {
        self.shared.bus.dispatch(event)
    }

    /// Boot (or reboot) as `node`: restore state, subscribe to the protocol,
    /// arm the election timer and start the heartbeat ticker.
    pub async fn start(&self, node: Peer) -> Result<(), RaftError> {
        self.shared.start(node).await
    }

    /// Simulate an in-place restart: flush state, fall back to follower and
    /// wait for the next election timeout. The node keeps running.
    pub async fn crash(&self, reason: &str) -> Result<(), RaftError> {
        self.shared.crash(reason).await
    }

    /// Stop all timers, flush state and drop every bus subscription.
    pub async fn destroy(&self) -> Result<(), RaftError> {
        self.shared.destroy().await
    }

    /// Overwrite the replicated value. Only the leader accepts it.
    pub fn replicate(&self, data: T) -> Result<(), RaftError> {
        self.shared.replicate(data)
    }

    pub async fn ack_node(&self, node: Peer) {
        self.shared.ack_node(node).await
    }

    pub fn data(&self) -> T {
        self.shared.lock_node().data().clone()
    }

    pub fn role(&self) -> NodeRole {
        self.shared.lock_node().role()
    }

    pub fn is_leader(&self) -> bool {
        self.shared.lock_node().is_leader()
    }

    pub fn leader(&self) -> Option<NodeId> {
        self.shared.lock_node().leader().cloned()
    }

    pub fn node(&self) -> Option<Peer> {
        self.shared.lock_node().node().cloned()
    }

    pub fn id(&self) -> Option<NodeId> {
        self.shared.lock_node().node().map(|node| node.id.clone())
    }

    pub fn followers(&self) -> Vec<Peer> {
        self.shared.lock_node().followers().to_vec()
    }

    pub fn term(&self) -> u64 {
        self.shared.lock_node().term()
    }

    pub fn voted_for(&self) -> Option<NodeId> {
        self.shared.lock_node().voted_for().cloned()
    }

    pub fn persistent_state(&self) -> PersistentState<T> {
        self.shared.lock_node().state().clone()
    }

    pub fn election_timer_pending(&self) -> bool {
        self.shared.election_timer.is_pending()
    }
}

impl<T: RaftData> Shared<T> {
    fn lock_node(&self) -> MutexGuard<'_, RaftNode<T>> {
        self.node.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe `handler` so that it runs with a strong reference to this
    /// node, or not at all once the node is gone.
    fn listen<F, Fut>(&self, channel: Channel, handler: F) -> Subscription
    where
        F: Fn(Arc<Shared<T>>, RaftEvent<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let weak = self.this.clone();
        self.bus.subscribe(channel, move |event| {
            let pending = weak.upgrade().map(|shared| handler(shared, event));
            async move {
                if let Some(pending) = pending {
                    pending.await;
                }
            }
        })
    }

    /// Run one state transition under the node lock and apply its timer
    /// side effects before the lock is released.
    fn transition<F>(&self, f: F) -> Vec<RaftEvent<T>>
    where
        F: FnOnce(&mut RaftNode<T>) -> Transition<T>,
    {
        let mut node = self.lock_node();
        let transition = f(&mut node);
        match transition.timer {
            TimerAction::Rearm => self.election_timer.start(),
            TimerAction::Cancel => self.election_timer.cancel(),
            TimerAction::Keep => {}
        }
        if transition.bootstrap {
            self.schedule_bootstrap();
        }
        transition.events
    }

    /// Dispatch every event now; the returned future waits for the handlers.
    fn emit(&self, events: Vec<RaftEvent<T>>) -> impl Future<Output = ()> + Send + 'static {
        let pending: Vec<_> = events
            .into_iter()
            .map(|event| self.bus.dispatch(event))
            .collect();
        async move {
            for dispatched in pending {
                dispatched.await;
            }
        }
    }

    async fn start(&self, node: Peer) -> Result<(), RaftError> {
        let restored = self.persist.restore(&node).await?;

        self.bus.clean(&PROTOCOL_CHANNELS);
        self.bus.clean(&[Channel::ReplicateData]);
        for channel in PROTOCOL_CHANNELS {
            self.listen(channel, |shared, event| shared.receive(event));
        }
        self.listen(Channel::ReplicateData, |shared, event| async move {
            if let RaftEvent::ReplicateData(data) = event {
                if let Err(e) = shared.replicate(data) {
                    debug!("Ignoring value update: {e}");
                }
            }
        });

        self.running.store(true, Ordering::SeqCst);
        let events = self.transition(|raft| raft.boot(node, restored));
        self.start_ticker();
        self.emit(events).await;
        Ok(())
    }

    async fn receive(self: Arc<Self>, event: RaftEvent<T>) {
        let events = self.transition(|raft| match event {
            RaftEvent::VoteRequestReceived(vote) => raft.vote_request_received(vote),
            RaftEvent::VoteResponseReceived(vote) => raft.vote_response_received(vote),
            RaftEvent::DataReceived(sync) => raft.data_received(sync),
            RaftEvent::DataResponseReceived(ack) => raft.data_response_received(ack),
            _ => Transition::default(),
        });
        self.emit(events).await;
    }

    async fn on_election_timeout(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        let events = self.transition(|raft| raft.election_timeout());
        self.emit(events).await;
    }

    async fn crash(&self, reason: &str) -> Result<(), RaftError> {
        let (node, snapshot, notice) = {
            let raft = self.lock_node();
            let node = raft.node().cloned().ok_or(RaftError::NotRunning)?;
            let snapshot = raft.state().clone();
            (node, snapshot, raft.crash_notice(reason))
        };
        self.emit(notice.events).await;

        self.persist.persist(&node, &snapshot).await?;

        let events = self.transition(|raft| raft.crashed());
        self.emit(events).await;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), RaftError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(ticker) = lock(&self.ticker).take() {
            ticker.abort();
        }
        for task in lock(&self.background).drain(..) {
            task.abort();
        }
        self.election_timer.cancel();

        let record = {
            let raft = self.lock_node();
            raft.node().cloned().map(|node| (node, raft.state().clone()))
        };
        if let Some((node, snapshot)) = record {
            self.persist.persist(&node, &snapshot).await?;
        }

        let notice = self.lock_node().notice("raft is gracefully destroying itself!");
        self.emit(notice.events).await;
        self.bus.clear();
        Ok(())
    }

    fn replicate(&self, data: T) -> Result<(), RaftError> {
        self.lock_node().replicate(data)
    }

    async fn ack_node(&self, node: Peer) {
        let events = self.transition(|raft| raft.ack_node(node));
        self.emit(events).await;
    }

    fn schedule_bootstrap(&self) {
        let weak = self.this.clone();
        let delay = self.config.bootstrap();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let shared = weak
                .upgrade()
                .filter(|shared| shared.running.load(Ordering::SeqCst));
            if let Some(shared) = shared {
                let events = shared.transition(|raft| raft.complete_bootstrap());
                shared.emit(events).await;
            }
        });

        let mut background = lock(&self.background);
        background.retain(|task| !task.is_finished());
        background.push(task);
    }

    fn start_ticker(&self) {
        let weak = self.this.clone();
        let period = self.config.heartbeat();
        let ticker = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let beats = shared.lock_node().heartbeat();
                if !beats.is_empty() {
                    // Fire and forget: a slow follower must not delay the next tick.
                    drop(shared.emit(beats));
                }
            }
        });

        if let Some(previous) = lock(&self.ticker).replace(ticker) {
            previous.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
