//! Fail-fast path for pods that can never report success.

use futures::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use events::{Event, EventBus};

use crate::error::BrokerError;
use crate::future::BrokerResultFuture;
use crate::listeners::ListenerGuard;
use crate::platform::PodEventWatch;

/// Consumes the platform's pod lifecycle watch and fails the shared result
/// future when the broker pod enters a state it cannot leave (failed
/// scheduling, unresolvable image pull).
///
/// Feature-flagged by the deploy phase; a racing success event still wins
/// because only the first transition into the future counts.
pub struct UnrecoverableEventListener;

impl UnrecoverableEventListener {
    pub fn spawn(
        watch: PodEventWatch,
        workspace_id: Uuid,
        future: BrokerResultFuture,
        bus: EventBus,
    ) -> ListenerGuard {
        let handle = tokio::spawn(async move {
            let mut stream = watch.into_stream();
            while let Some(event) = stream.next().await {
                if !event.unrecoverable {
                    debug!(
                        pod_name = %event.pod_name,
                        reason = %event.reason,
                        "Pod lifecycle event"
                    );
                    continue;
                }

                warn!(
                    workspace_id = %workspace_id,
                    pod_name = %event.pod_name,
                    reason = %event.reason,
                    message = %event.message,
                    "Broker pod entered an unrecoverable state"
                );
                bus.publish_event(Event::PodUnrecoverable {
                    workspace_id,
                    pod_name: event.pod_name.clone(),
                    reason: event.reason.clone(),
                    message: event.message.clone(),
                });
                future
                    .fail(BrokerError::UnrecoverablePod {
                        pod_name: event.pod_name,
                        reason: event.reason,
                        message: event.message,
                    })
                    .await;
                break;
            }
        });

        ListenerGuard::new("unrecoverable-pod-events", handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PodLifecycleEvent;
    use broker_core::ResolvedPlugin;
    use std::time::Duration;

    fn unrecoverable(pod: &str) -> PodLifecycleEvent {
        PodLifecycleEvent {
            pod_name: pod.to_string(),
            reason: "FailedScheduling".to_string(),
            message: "0/3 nodes are available".to_string(),
            unrecoverable: true,
        }
    }

    #[tokio::test]
    async fn test_unrecoverable_event_fails_future() {
        let (tx, watch) = PodEventWatch::channel(4);
        let future = BrokerResultFuture::new();
        let bus = EventBus::new();
        let workspace_id = Uuid::new_v4();
        let _guard =
            UnrecoverableEventListener::spawn(watch, workspace_id, future.clone(), bus.clone());

        tx.send(unrecoverable("broker-abc")).await.unwrap();

        let error = future.wait(Duration::from_secs(1)).await.unwrap_err();
        let text = error.to_string();
        assert!(text.contains("broker-abc"));
        assert!(text.contains("FailedScheduling"));
        assert!(text.contains("0/3 nodes are available"));
    }

    #[tokio::test]
    async fn test_decision_is_mirrored_onto_bus() {
        let (tx, watch) = PodEventWatch::channel(4);
        let future = BrokerResultFuture::new();
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let workspace_id = Uuid::new_v4();
        let _guard =
            UnrecoverableEventListener::spawn(watch, workspace_id, future.clone(), bus.clone());

        tx.send(unrecoverable("broker-abc")).await.unwrap();

        let envelope = rx.recv().await.unwrap();
        match envelope.event {
            Event::PodUnrecoverable { pod_name, reason, .. } => {
                assert_eq!(pod_name, "broker-abc");
                assert_eq!(reason, "FailedScheduling");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recoverable_events_are_skipped() {
        let (tx, watch) = PodEventWatch::channel(4);
        let future = BrokerResultFuture::new();
        let bus = EventBus::new();
        let _guard =
            UnrecoverableEventListener::spawn(watch, Uuid::new_v4(), future.clone(), bus);

        tx.send(PodLifecycleEvent {
            pod_name: "broker-abc".to_string(),
            reason: "Scheduled".to_string(),
            message: "assigned to node-1".to_string(),
            unrecoverable: false,
        })
        .await
        .unwrap();

        let error = future.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(error, BrokerError::WaitTimeout { .. }));
    }

    #[tokio::test]
    async fn test_stale_failure_loses_race_against_success() {
        let (tx, watch) = PodEventWatch::channel(4);
        let future = BrokerResultFuture::new();
        let bus = EventBus::new();
        let _guard =
            UnrecoverableEventListener::spawn(watch, Uuid::new_v4(), future.clone(), bus);

        future
            .complete(vec![ResolvedPlugin::new("p/n/1", "img")])
            .await;
        tx.send(unrecoverable("broker-abc")).await.unwrap();
        tokio::task::yield_now().await;

        assert!(future.wait(Duration::from_secs(1)).await.is_ok());
    }
}
