//! Bridges broker status events from the bus to the result future.

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use broker_core::{BrokerStatus, ResolvedPlugin};
use events::{Event, EventBus};

use crate::error::BrokerError;
use crate::future::BrokerResultFuture;
use crate::listeners::ListenerGuard;

/// Listens for the broker's `Done`/`Failed` status events scoped to one
/// workspace and settles the shared result future exactly once.
pub struct BrokerStatusListener;

impl BrokerStatusListener {
    /// Subscribe to the bus and start the bridge task.
    pub fn spawn(
        bus: &EventBus,
        workspace_id: Uuid,
        future: BrokerResultFuture,
        validate: bool,
    ) -> ListenerGuard {
        let mut rx = bus.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => {
                        if envelope.event.workspace_id() != workspace_id {
                            continue;
                        }
                        if let Event::BrokerStatus {
                            status,
                            error,
                            plugins,
                            ..
                        } = envelope.event
                        {
                            if Self::handle_status(&future, workspace_id, status, error, plugins, validate)
                                .await
                            {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(workspace_id = %workspace_id, skipped, "Status listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        ListenerGuard::new("broker-status", handle)
    }

    /// Returns true once a terminal status settled the future.
    async fn handle_status(
        future: &BrokerResultFuture,
        workspace_id: Uuid,
        status: BrokerStatus,
        error: Option<String>,
        plugins: Option<Vec<ResolvedPlugin>>,
        validate: bool,
    ) -> bool {
        match status {
            BrokerStatus::Started => {
                debug!(workspace_id = %workspace_id, "Broker started");
                false
            }
            BrokerStatus::Done => {
                let Some(plugins) = plugins else {
                    future
                        .fail(BrokerError::Validation(
                            "broker done event carried no plugin list".to_string(),
                        ))
                        .await;
                    return true;
                };
                if validate {
                    if let Some(err) = plugins.iter().find_map(|p| p.validate().err()) {
                        future.fail(BrokerError::Validation(err.to_string())).await;
                        return true;
                    }
                }
                debug!(
                    workspace_id = %workspace_id,
                    plugin_count = plugins.len(),
                    "Broker completed"
                );
                future.complete(plugins).await;
                true
            }
            BrokerStatus::Failed => {
                let message = error
                    .unwrap_or_else(|| "broker reported failure without a message".to_string());
                future.fail(BrokerError::BrokerReported(message)).await;
                true
            }
        }
    }
}
