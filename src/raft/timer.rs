use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::sleep;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TimerCallback = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// Single-shot timer that fires after a random delay in `[min, max)`.
///
/// Every `start()` replaces the pending deadline with a fresh random one, which
/// is what keeps independent nodes from timing out in lockstep.
pub struct CancelableTimer {
    callback: TimerCallback,
    min: Duration,
    max: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl CancelableTimer {
    pub fn new<F, Fut>(callback: F, min: Duration, max: Duration) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let callback: TimerCallback = Arc::new(move || -> BoxFuture { Box::pin(callback()) });
        Self {
            callback,
            min,
            max,
            pending: Mutex::new(None),
        }
    }

    /// Cancel whatever is pending and schedule exactly one new fire.
    pub fn start(&self) {
        let wait = self.random_wait();
        let callback = Arc::clone(&self.callback);

        // The callback runs in its own task so that a start()/cancel() issued
        // from inside the callback cannot abort it halfway.
        let handle = tokio::spawn(async move {
            sleep(wait).await;
            tokio::spawn(callback());
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn random_wait(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..self.max)
    }
}

impl Drop for CancelableTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
