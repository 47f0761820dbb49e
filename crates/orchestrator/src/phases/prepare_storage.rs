//! First phase: make sure the workspace's durable volumes exist.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use broker_core::{ResolvedPlugin, RuntimeIdentity, WorkloadSpec};

use crate::error::{BrokerError, Result};
use crate::phases::BrokerPhase;
use crate::storage::{StorageOptions, StorageProvisioner};

/// Delegates to the storage provisioner, bounded by the configured timeout
/// budget. Creates nothing it has to clean up itself: anything the
/// provisioner makes stays under the provisioner's ownership.
pub struct PrepareStorage {
    storage: Arc<dyn StorageProvisioner>,
    spec: WorkloadSpec,
    identity: RuntimeIdentity,
    timeout: Duration,
    options: StorageOptions,
    next: Box<dyn BrokerPhase>,
}

impl PrepareStorage {
    pub fn new(
        storage: Arc<dyn StorageProvisioner>,
        spec: WorkloadSpec,
        identity: RuntimeIdentity,
        timeout: Duration,
        options: StorageOptions,
        next: Box<dyn BrokerPhase>,
    ) -> Self {
        Self {
            storage,
            spec,
            identity,
            timeout,
            options,
            next,
        }
    }
}

#[async_trait]
impl BrokerPhase for PrepareStorage {
    fn name(&self) -> &'static str {
        "prepare-storage"
    }

    async fn execute(self: Box<Self>) -> Result<Vec<ResolvedPlugin>> {
        debug!(
            workspace_id = %self.identity.workspace_id,
            timeout_ms = self.timeout.as_millis() as u64,
            "Preparing durable storage"
        );

        let prepare = self
            .storage
            .prepare(&self.spec, &self.identity, self.timeout, &self.options);
        match tokio::time::timeout(self.timeout, prepare).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(BrokerError::Storage(error)),
            Err(_) => {
                return Err(BrokerError::StorageTimeout {
                    millis: self.timeout.as_millis() as u64,
                })
            }
        }

        self.next.execute().await
    }
}
