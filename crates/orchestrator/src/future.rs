//! Single-assignment hand-off between the event listeners and the waiter.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use broker_core::ResolvedPlugin;

use crate::error::{BrokerError, Result};

#[derive(Debug)]
enum State {
    Pending,
    Complete(Vec<ResolvedPlugin>),
    Failed(BrokerError),
    Interrupted,
}

struct Inner {
    state: Mutex<State>,
    notify: Notify,
}

/// Completion handle shared by the status listener, the unrecoverable-event
/// listener and the wait phase.
///
/// The transition out of pending happens at most once: the first of
/// `complete` / `fail` / `interrupt` wins and every later call is a no-op
/// returning `false`. The internal mutex is the only serialization point in
/// the pipeline.
#[derive(Clone)]
pub struct BrokerResultFuture {
    inner: Arc<Inner>,
}

impl BrokerResultFuture {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending),
                notify: Notify::new(),
            }),
        }
    }

    /// Settle with the resolved plugin list. Returns whether this call won.
    pub async fn complete(&self, plugins: Vec<ResolvedPlugin>) -> bool {
        self.settle(State::Complete(plugins)).await
    }

    /// Settle with a failure. Returns whether this call won.
    pub async fn fail(&self, error: BrokerError) -> bool {
        self.settle(State::Failed(error)).await
    }

    /// Cooperative cancellation from the surrounding startup process; the
    /// waiter surfaces [`BrokerError::Interrupted`] once cleanup has run.
    pub async fn interrupt(&self) -> bool {
        self.settle(State::Interrupted).await
    }

    pub async fn is_pending(&self) -> bool {
        matches!(*self.inner.state.lock().await, State::Pending)
    }

    async fn settle(&self, next: State) -> bool {
        let mut state = self.inner.state.lock().await;
        if !matches!(*state, State::Pending) {
            debug!("Result future already settled, ignoring late transition");
            return false;
        }
        *state = next;
        drop(state);
        self.inner.notify.notify_waiters();
        true
    }

    /// Block the calling task until the future settles or `timeout` elapses.
    ///
    /// A stored failure is re-raised as-is so the original cause reaches the
    /// caller; a settled future keeps answering later `wait` calls.
    pub async fn wait(&self, timeout: Duration) -> Result<Vec<ResolvedPlugin>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before the state check so a transition between the
            // check and the await cannot be missed.
            notified.as_mut().enable();

            {
                let state = self.inner.state.lock().await;
                match &*state {
                    State::Pending => {}
                    State::Complete(plugins) => return Ok(plugins.clone()),
                    State::Failed(error) => return Err(error.clone()),
                    State::Interrupted => return Err(BrokerError::Interrupted),
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(BrokerError::WaitTimeout {
                    seconds: timeout.as_secs(),
                });
            }
        }
    }
}

impl Default for BrokerResultFuture {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BrokerResultFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerResultFuture").finish_non_exhaustive()
    }
}
