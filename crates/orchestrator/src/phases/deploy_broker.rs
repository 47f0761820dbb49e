//! Fourth phase: submit the broker workload and tear every piece of it
//! down again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use broker_core::{ResolvedPlugin, WorkloadSpec};
use events::{Event, EventBus};

use crate::error::{BrokerError, Result};
use crate::future::BrokerResultFuture;
use crate::listeners::{ListenerGuard, UnrecoverableEventListener};
use crate::phases::BrokerPhase;
use crate::platform::{LogStreamOptions, LogWatch, PlatformClient};
use crate::trace::SpanTracer;

/// Deploy-time switches derived from [`crate::config::BrokerConfig`].
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub debug_logs: bool,
    pub log_limit_bytes: u64,
    pub log_follow_timeout: Duration,
    pub fail_fast_on_unrecoverable_events: bool,
}

/// Creates every supporting config/secret object from the workload spec,
/// optionally wires the fail-fast lifecycle watch and a log forwarder,
/// submits the pod and delegates. The guaranteed cleanup step stops all
/// watches and deletes pod, secrets and config objects independently, so a
/// single deletion failure never blocks the rest; failures are logged and
/// the delegate's result is preserved. If submission fails before
/// delegation, whatever was already created is still torn down first.
pub struct DeployBroker {
    platform: Arc<dyn PlatformClient>,
    bus: EventBus,
    tracer: Arc<dyn SpanTracer>,
    future: BrokerResultFuture,
    spec: WorkloadSpec,
    workspace_id: Uuid,
    options: DeployOptions,
    next: Box<dyn BrokerPhase>,
}

impl DeployBroker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        bus: EventBus,
        tracer: Arc<dyn SpanTracer>,
        future: BrokerResultFuture,
        spec: WorkloadSpec,
        workspace_id: Uuid,
        options: DeployOptions,
        next: Box<dyn BrokerPhase>,
    ) -> Self {
        Self {
            platform,
            bus,
            tracer,
            future,
            spec,
            workspace_id,
            options,
            next,
        }
    }
}

#[async_trait]
impl BrokerPhase for DeployBroker {
    fn name(&self) -> &'static str {
        "deploy-broker"
    }

    async fn execute(self: Box<Self>) -> Result<Vec<ResolvedPlugin>> {
        let DeployBroker {
            platform,
            bus,
            tracer,
            future,
            spec,
            workspace_id,
            options,
            next,
        } = *self;

        let span = tracer.start_span("deploy-broker");
        let mut teardown = Teardown::new(platform.clone());

        let deployed = deploy(
            &platform,
            &bus,
            &future,
            &spec,
            workspace_id,
            &options,
            &mut teardown,
        )
        .await;

        let result = match deployed {
            Ok(()) => next.execute().await,
            Err(error) => Err(error),
        };

        teardown.run().await;

        if let Err(error) = &result {
            tracer.set_error(&span, error);
        }
        tracer.finish(span);

        result
    }
}

async fn deploy(
    platform: &Arc<dyn PlatformClient>,
    bus: &EventBus,
    future: &BrokerResultFuture,
    spec: &WorkloadSpec,
    workspace_id: Uuid,
    options: &DeployOptions,
    teardown: &mut Teardown,
) -> Result<()> {
    for object in &spec.config_objects {
        platform
            .create_config_object(object)
            .await
            .map_err(|e| BrokerError::platform("config object creation", e))?;
        teardown.config_objects.push(object.name.clone());
    }

    for secret in &spec.secrets {
        platform
            .create_secret(secret)
            .await
            .map_err(|e| BrokerError::platform("secret creation", e))?;
        teardown.secrets.push(secret.name.clone());
    }

    if options.fail_fast_on_unrecoverable_events {
        let watch = platform
            .watch_pod_events(&[spec.pod.name.clone()])
            .await
            .map_err(|e| BrokerError::platform("pod event watch", e))?;
        teardown.watches.push(UnrecoverableEventListener::spawn(
            watch,
            workspace_id,
            future.clone(),
            bus.clone(),
        ));
    }

    platform
        .create_pod(&spec.pod)
        .await
        .map_err(|e| BrokerError::platform("pod creation", e))?;
    teardown.pod = Some(spec.pod.name.clone());
    info!(
        pod = %spec.pod.name,
        workspace_id = %workspace_id,
        "Broker workload submitted"
    );

    if options.debug_logs {
        let log_options = LogStreamOptions {
            byte_limit: options.log_limit_bytes,
            follow_timeout: options.log_follow_timeout,
        };
        match platform.stream_logs(&spec.pod.name, log_options).await {
            Ok(watch) => teardown.watches.push(spawn_log_forwarder(
                bus.clone(),
                workspace_id,
                spec.pod.name.clone(),
                watch,
            )),
            // Log streaming is best-effort; the broker run does not depend
            // on it.
            Err(error) => {
                warn!(pod = %spec.pod.name, error = %error, "Failed to start broker log streaming")
            }
        }
    }

    Ok(())
}

fn spawn_log_forwarder(
    bus: EventBus,
    workspace_id: Uuid,
    pod_name: String,
    watch: LogWatch,
) -> ListenerGuard {
    let handle = tokio::spawn(async move {
        let mut stream = watch.into_stream();
        while let Some(text) = stream.next().await {
            bus.publish_event(Event::BrokerLog {
                workspace_id,
                pod_name: pod_name.clone(),
                text,
            });
        }
    });
    ListenerGuard::new("broker-log-forwarder", handle)
}

/// Resources this phase created, torn down in reverse order of creation:
/// watches first, then the pod, then secrets, then config objects.
struct Teardown {
    platform: Arc<dyn PlatformClient>,
    watches: Vec<ListenerGuard>,
    pod: Option<String>,
    secrets: Vec<String>,
    config_objects: Vec<String>,
}

impl Teardown {
    fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self {
            platform,
            watches: Vec::new(),
            pod: None,
            secrets: Vec::new(),
            config_objects: Vec::new(),
        }
    }

    /// Every deletion is attempted independently; failures are logged and
    /// never raised.
    async fn run(mut self) {
        for watch in &mut self.watches {
            watch.unsubscribe();
        }

        if let Some(pod) = &self.pod {
            if let Err(error) = self.platform.delete_pod(pod).await {
                warn!(pod = %pod, error = %error, "Failed to delete broker pod");
            }
        }

        for name in &self.secrets {
            if let Err(error) = self.platform.delete_secret(name).await {
                warn!(secret = %name, error = %error, "Failed to delete broker secret");
            }
        }

        for name in &self.config_objects {
            if let Err(error) = self.platform.delete_config_object(name).await {
                warn!(object = %name, error = %error, "Failed to delete broker config object");
            }
        }
    }
}
