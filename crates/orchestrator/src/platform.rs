//! Client seam to the container-orchestration platform.
//!
//! The pipeline only needs a narrow slice of the platform API: create/delete
//! for pods, config objects and secrets, a pod lifecycle watch and container
//! log streaming. Everything is fallible with a [`PlatformError`] the
//! orchestrator wraps into its own error kinds.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use broker_core::{ConfigObject, PodSpec, SecretObject};

/// Failure reported by the orchestration platform client.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One pod lifecycle event delivered by the platform watch.
#[derive(Debug, Clone)]
pub struct PodLifecycleEvent {
    pub pod_name: String,
    /// Platform reason code, e.g. `FailedScheduling` or `ErrImagePull`.
    pub reason: String,
    pub message: String,
    /// True when the pod can never reach a running state from here.
    pub unrecoverable: bool,
}

/// Live pod lifecycle watch. Dropping the watch ends the subscription.
pub struct PodEventWatch {
    receiver: mpsc::Receiver<PodLifecycleEvent>,
}

impl PodEventWatch {
    pub fn new(receiver: mpsc::Receiver<PodLifecycleEvent>) -> Self {
        Self { receiver }
    }

    /// Channel pair for platform implementations.
    pub fn channel(capacity: usize) -> (mpsc::Sender<PodLifecycleEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    pub fn into_stream(self) -> ReceiverStream<PodLifecycleEvent> {
        ReceiverStream::new(self.receiver)
    }
}

/// Byte/time budget for a container log stream.
#[derive(Debug, Clone, Copy)]
pub struct LogStreamOptions {
    pub byte_limit: u64,
    pub follow_timeout: Duration,
}

/// Live container log stream. Dropping the watch ends the stream.
pub struct LogWatch {
    receiver: mpsc::Receiver<String>,
}

impl LogWatch {
    pub fn new(receiver: mpsc::Receiver<String>) -> Self {
        Self { receiver }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    pub fn into_stream(self) -> ReceiverStream<String> {
        ReceiverStream::new(self.receiver)
    }
}

/// Container-orchestration client consumed by the pipeline.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn create_pod(&self, pod: &PodSpec) -> std::result::Result<(), PlatformError>;

    async fn delete_pod(&self, name: &str) -> std::result::Result<(), PlatformError>;

    async fn create_config_object(
        &self,
        object: &ConfigObject,
    ) -> std::result::Result<(), PlatformError>;

    async fn delete_config_object(&self, name: &str) -> std::result::Result<(), PlatformError>;

    async fn create_secret(&self, secret: &SecretObject) -> std::result::Result<(), PlatformError>;

    async fn delete_secret(&self, name: &str) -> std::result::Result<(), PlatformError>;

    /// Watch lifecycle events for the named pods only.
    async fn watch_pod_events(
        &self,
        pod_names: &[String],
    ) -> std::result::Result<PodEventWatch, PlatformError>;

    /// Stream container logs within the given byte/time budget.
    async fn stream_logs(
        &self,
        pod_name: &str,
        options: LogStreamOptions,
    ) -> std::result::Result<LogWatch, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_pod_event_watch_stream() {
        let (tx, watch) = PodEventWatch::channel(4);
        tx.send(PodLifecycleEvent {
            pod_name: "broker-abc".to_string(),
            reason: "Scheduled".to_string(),
            message: "assigned to node-1".to_string(),
            unrecoverable: false,
        })
        .await
        .unwrap();
        drop(tx);

        let events: Vec<_> = watch.into_stream().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pod_name, "broker-abc");
    }

    #[tokio::test]
    async fn test_log_watch_stream_ends_when_sender_drops() {
        let (tx, watch) = LogWatch::channel(4);
        tx.send("starting broker".to_string()).await.unwrap();
        drop(tx);

        let lines: Vec<_> = watch.into_stream().collect().await;
        assert_eq!(lines, vec!["starting broker".to_string()]);
    }
}
