use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use log::warn;

/// An event that knows which channel it travels on.
pub trait BusEvent: Clone + Send + 'static {
    type Channel: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn channel(&self) -> Self::Channel;
}

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Handler<E> = Arc<dyn Fn(E) -> BoxFuture + Send + Sync>;

struct Listener<E> {
    id: u64,
    handler: Handler<E>,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

type Registry<E> = Mutex<HashMap<<E as BusEvent>::Channel, Vec<Listener<E>>>>;

/// Publish/subscribe hub owned by a single node.
///
/// Handlers for a dispatched event each run in their own task; there is no
/// ordering between handlers or between channels.
pub struct EventBus<E: BusEvent> {
    registry: Arc<Registry<E>>,
    next_id: AtomicU64,
}

/// Handle returned by [`EventBus::subscribe`]. Dropping it keeps the handler
/// registered.
pub struct Subscription {
    remove: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.remove)()
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F, Fut>(&self, channel: E::Channel, handler: F) -> Subscription
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Handler<E> =
            Arc::new(move |event| -> BoxFuture { Box::pin(handler(event)) });

        lock(&self.registry)
            .entry(channel)
            .or_default()
            .push(Listener { id, handler });

        let registry: Weak<Registry<E>> = Arc::downgrade(&self.registry);
        Subscription {
            remove: Box::new(move || {
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                if let Some(listeners) = lock(&registry).get_mut(&channel) {
                    listeners.retain(|listener| listener.id != id);
                };
            }),
        }
    }

    /// Schedule every handler currently registered on the event's channel.
    ///
    /// Handlers are spawned before this returns; the returned future only
    /// waits for them. Dropping it leaves the handlers running.
    pub fn dispatch(&self, event: E) -> impl Future<Output = ()> + Send + 'static {
        let channel = event.channel();
        let snapshot: Vec<Listener<E>> = lock(&self.registry)
            .get(&channel)
            .cloned()
            .unwrap_or_default();

        let handles: Vec<_> = snapshot
            .into_iter()
            .map(|listener| tokio::spawn((listener.handler)(event.clone())))
            .collect();

        async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Handler on channel {channel:?} failed: {e}");
                }
            }
        }
    }

    /// Drop every handler of the given channels, or of all channels when the
    /// slice is empty.
    pub fn clean(&self, channels: &[E::Channel]) {
        let mut registry = lock(&self.registry);
        if channels.is_empty() {
            registry.clear();
            return;
        }
        for channel in channels {
            registry.insert(*channel, Vec::new());
        }
    }

    pub fn clear(&self) {
        lock(&self.registry).clear();
    }

    pub fn listener_count(&self, channel: E::Channel) -> usize {
        lock(&self.registry).get(&channel).map_or(0, Vec::len)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
