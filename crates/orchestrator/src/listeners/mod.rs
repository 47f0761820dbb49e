//! Event-driven bridges feeding the shared result future.

mod status;
mod unrecoverable;

pub use status::BrokerStatusListener;
pub use unrecoverable::UnrecoverableEventListener;

use tokio::task::JoinHandle;
use tracing::debug;

/// Handle for a spawned listener task.
///
/// The owning phase calls [`unsubscribe`](Self::unsubscribe) in its cleanup
/// step; dropping the guard aborts the task as a fallback so a listener can
/// never outlive its phase.
pub struct ListenerGuard {
    name: &'static str,
    handle: JoinHandle<()>,
    unsubscribed: bool,
}

impl ListenerGuard {
    pub fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        debug!(listener = name, "Listener subscribed");
        Self {
            name,
            handle,
            unsubscribed: false,
        }
    }

    /// Stop the listener. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.unsubscribed {
            return;
        }
        self.handle.abort();
        self.unsubscribed = true;
        debug!(listener = self.name, "Listener unsubscribed");
    }

    pub fn is_subscribed(&self) -> bool {
        !self.unsubscribed && !self.handle.is_finished()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if !self.unsubscribed {
            self.handle.abort();
            debug!(listener = self.name, "Listener aborted on drop");
        }
    }
}
