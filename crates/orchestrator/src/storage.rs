//! Storage-provisioning seam.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use broker_core::{RuntimeIdentity, WorkloadSpec};

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Provisioning hints forwarded to the storage strategy untouched.
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    pub attributes: BTreeMap<String, String>,
}

/// Prepares the workspace's durable volumes before the broker is deployed.
///
/// Ownership of anything created here stays with the provisioner; the
/// pipeline never deletes storage.
#[async_trait]
pub trait StorageProvisioner: Send + Sync {
    async fn prepare(
        &self,
        spec: &WorkloadSpec,
        identity: &RuntimeIdentity,
        timeout: Duration,
        options: &StorageOptions,
    ) -> std::result::Result<(), StorageError>;
}

/// Provisioner for platforms where workspace volumes already exist.
pub struct NoopStorageProvisioner;

#[async_trait]
impl StorageProvisioner for NoopStorageProvisioner {
    async fn prepare(
        &self,
        _spec: &WorkloadSpec,
        _identity: &RuntimeIdentity,
        _timeout: Duration,
        _options: &StorageOptions,
    ) -> std::result::Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_core::PodSpec;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_noop_provisioner_always_succeeds() {
        let spec = WorkloadSpec::new(PodSpec::new("broker-pod"));
        let identity = RuntimeIdentity::new(Uuid::new_v4(), "default", "owner");

        let result = NoopStorageProvisioner
            .prepare(
                &spec,
                &identity,
                Duration::from_secs(1),
                &StorageOptions::default(),
            )
            .await;
        assert!(result.is_ok());
    }
}
