//! Terminal phase: block on the result future.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use broker_core::ResolvedPlugin;

use crate::error::Result;
use crate::future::BrokerResultFuture;
use crate::phases::BrokerPhase;

/// Has no successor. Blocks on the shared future within the configured
/// timeout; a stored failure is re-raised as-is so the broker's own reason
/// reaches the caller, never a generic wrapper.
pub struct WaitBrokerResult {
    future: BrokerResultFuture,
    timeout: Duration,
}

impl WaitBrokerResult {
    pub fn new(future: BrokerResultFuture, timeout: Duration) -> Self {
        Self { future, timeout }
    }
}

#[async_trait]
impl BrokerPhase for WaitBrokerResult {
    fn name(&self) -> &'static str {
        "wait-broker-result"
    }

    async fn execute(self: Box<Self>) -> Result<Vec<ResolvedPlugin>> {
        debug!(
            timeout_secs = self.timeout.as_secs(),
            "Waiting for the broker result"
        );
        self.future.wait(self.timeout).await
    }
}
