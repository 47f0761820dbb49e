//! Caller-facing entry point: one method per broker flavor.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use broker_core::{PluginReference, ResolvedPlugin, RuntimeIdentity};
use events::EventBus;

use crate::config::BrokerConfig;
use crate::environment::{BrokerEnvironment, BrokerEnvironmentFactory};
use crate::error::Result;
use crate::future::BrokerResultFuture;
use crate::phases::{
    BrokerPhase, DeliverMetadata, DeployBroker, DeployOptions, ListenBrokerEvents, PrepareStorage,
    WaitBrokerResult,
};
use crate::platform::PlatformClient;
use crate::storage::{NoopStorageProvisioner, StorageOptions, StorageProvisioner};
use crate::trace::{NoopTracer, SpanTracer};

/// Provisions one broker run per call: builds the workload description,
/// assembles the five-phase chain around a fresh result future and executes
/// it. Exactly one terminal outcome surfaces per invocation — a fully
/// resolved plugin list or a single descriptive error.
pub struct PluginBrokerManager {
    platform: Arc<dyn PlatformClient>,
    storage: Arc<dyn StorageProvisioner>,
    tracer: Arc<dyn SpanTracer>,
    bus: EventBus,
    config: BrokerConfig,
    factory: BrokerEnvironmentFactory,
}

impl PluginBrokerManager {
    pub fn new(platform: Arc<dyn PlatformClient>, config: BrokerConfig) -> Self {
        Self {
            factory: BrokerEnvironmentFactory::new(config.clone()),
            storage: Arc::new(NoopStorageProvisioner),
            tracer: Arc::new(NoopTracer),
            bus: EventBus::new(),
            platform,
            config,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_storage_provisioner(mut self, storage: Arc<dyn StorageProvisioner>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn SpanTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Resolve plugin metadata for the given references.
    pub async fn resolve_metadata(
        &self,
        references: &[PluginReference],
        identity: &RuntimeIdentity,
        merge_plugins: bool,
    ) -> Result<Vec<ResolvedPlugin>> {
        self.resolve_metadata_with(BrokerResultFuture::new(), references, identity, merge_plugins)
            .await
    }

    /// Like [`resolve_metadata`](Self::resolve_metadata), but with a
    /// caller-owned result future so the surrounding startup process can
    /// `interrupt()` the wait.
    pub async fn resolve_metadata_with(
        &self,
        future: BrokerResultFuture,
        references: &[PluginReference],
        identity: &RuntimeIdentity,
        merge_plugins: bool,
    ) -> Result<Vec<ResolvedPlugin>> {
        let environment =
            self.factory
                .create_for_metadata_broker(references, identity, merge_plugins)?;
        self.run(environment, identity, future).await
    }

    /// Download plugin artifacts for the given references into the
    /// workspace's durable plugins volume.
    pub async fn resolve_artifacts(
        &self,
        references: &[PluginReference],
        identity: &RuntimeIdentity,
        merge_plugins: bool,
    ) -> Result<Vec<ResolvedPlugin>> {
        self.resolve_artifacts_with(BrokerResultFuture::new(), references, identity, merge_plugins)
            .await
    }

    pub async fn resolve_artifacts_with(
        &self,
        future: BrokerResultFuture,
        references: &[PluginReference],
        identity: &RuntimeIdentity,
        merge_plugins: bool,
    ) -> Result<Vec<ResolvedPlugin>> {
        let environment =
            self.factory
                .create_for_artifacts_broker(references, identity, merge_plugins)?;
        self.run(environment, identity, future).await
    }

    async fn run(
        &self,
        environment: BrokerEnvironment,
        identity: &RuntimeIdentity,
        future: BrokerResultFuture,
    ) -> Result<Vec<ResolvedPlugin>> {
        info!(
            workspace_id = %identity.workspace_id,
            pod = %environment.spec.pod.name,
            "Provisioning plugin broker"
        );

        let chain = self.build_chain(environment, identity, future);
        let result = chain.execute().await;

        match &result {
            Ok(plugins) => info!(
                workspace_id = %identity.workspace_id,
                plugin_count = plugins.len(),
                "Plugin broker finished"
            ),
            Err(error) => info!(
                workspace_id = %identity.workspace_id,
                error = %error,
                "Plugin broker failed"
            ),
        }

        result
    }

    /// Chain construction is bottom-up; execution order is the reverse:
    /// prepare storage, deliver metadata, listen, deploy, wait.
    fn build_chain(
        &self,
        environment: BrokerEnvironment,
        identity: &RuntimeIdentity,
        future: BrokerResultFuture,
    ) -> Box<dyn BrokerPhase> {
        let BrokerEnvironment {
            spec,
            metadata_config,
        } = environment;
        let storage_spec = spec.clone();

        let wait = Box::new(WaitBrokerResult::new(
            future.clone(),
            Duration::from_secs(self.config.wait_timeout_minutes * 60),
        ));

        let deploy = Box::new(DeployBroker::new(
            self.platform.clone(),
            self.bus.clone(),
            self.tracer.clone(),
            future.clone(),
            spec,
            identity.workspace_id,
            DeployOptions {
                debug_logs: self.config.debug_logs,
                log_limit_bytes: self.config.log_limit_bytes,
                log_follow_timeout: Duration::from_secs(self.config.wait_timeout_minutes * 60),
                fail_fast_on_unrecoverable_events: self.config.fail_fast_on_unrecoverable_events,
            },
            wait,
        ));

        let listen = Box::new(ListenBrokerEvents::new(
            self.bus.clone(),
            identity.workspace_id,
            future,
            self.config.validate_plugins,
            deploy,
        ));

        let deliver = Box::new(DeliverMetadata::new(
            self.platform.clone(),
            metadata_config,
            listen,
        ));

        Box::new(PrepareStorage::new(
            self.storage.clone(),
            storage_spec,
            identity.clone(),
            Duration::from_millis(self.config.storage_timeout_millis),
            StorageOptions::default(),
            deliver,
        ))
    }
}
