//! Shared fixtures for orchestrator integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use broker_core::{ConfigObject, PodSpec, SecretObject};
use orchestrator::{
    LogStreamOptions, LogWatch, PlatformClient, PlatformError, PodEventWatch, PodLifecycleEvent,
};

/// Platform client that records every create/delete and hands the test a
/// sender for pod lifecycle events and log lines.
#[derive(Default)]
pub struct RecordingPlatform {
    pub created_pods: Mutex<Vec<PodSpec>>,
    pub deleted_pods: Mutex<Vec<String>>,
    pub created_config_objects: Mutex<Vec<ConfigObject>>,
    pub deleted_config_objects: Mutex<Vec<String>>,
    pub created_secrets: Mutex<Vec<SecretObject>>,
    pub deleted_secrets: Mutex<Vec<String>>,
    pub watched_pods: Mutex<Vec<String>>,
    pub fail_pod_creation: AtomicBool,
    pub fail_config_object_deletion: AtomicBool,
    pod_events: Mutex<Option<mpsc::Sender<PodLifecycleEvent>>>,
    logs: Mutex<Option<mpsc::Sender<String>>>,
}

impl RecordingPlatform {
    pub fn pod_event_sender(&self) -> Option<mpsc::Sender<PodLifecycleEvent>> {
        self.pod_events.lock().unwrap().clone()
    }

    pub fn log_sender(&self) -> Option<mpsc::Sender<String>> {
        self.logs.lock().unwrap().clone()
    }

    pub fn pod_created(&self) -> bool {
        !self.created_pods.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl PlatformClient for RecordingPlatform {
    async fn create_pod(&self, pod: &PodSpec) -> Result<(), PlatformError> {
        if self.fail_pod_creation.load(Ordering::SeqCst) {
            return Err(PlatformError::new("admission webhook denied the pod"));
        }
        self.created_pods.lock().unwrap().push(pod.clone());
        Ok(())
    }

    async fn delete_pod(&self, name: &str) -> Result<(), PlatformError> {
        self.deleted_pods.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn create_config_object(&self, object: &ConfigObject) -> Result<(), PlatformError> {
        self.created_config_objects
            .lock()
            .unwrap()
            .push(object.clone());
        Ok(())
    }

    async fn delete_config_object(&self, name: &str) -> Result<(), PlatformError> {
        if self.fail_config_object_deletion.load(Ordering::SeqCst) {
            return Err(PlatformError::new("config object deletion rejected"));
        }
        self.deleted_config_objects
            .lock()
            .unwrap()
            .push(name.to_string());
        Ok(())
    }

    async fn create_secret(&self, secret: &SecretObject) -> Result<(), PlatformError> {
        self.created_secrets.lock().unwrap().push(secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> Result<(), PlatformError> {
        self.deleted_secrets.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn watch_pod_events(&self, pod_names: &[String]) -> Result<PodEventWatch, PlatformError> {
        self.watched_pods
            .lock()
            .unwrap()
            .extend(pod_names.iter().cloned());
        let (tx, watch) = PodEventWatch::channel(16);
        *self.pod_events.lock().unwrap() = Some(tx);
        Ok(watch)
    }

    async fn stream_logs(
        &self,
        _pod_name: &str,
        _options: LogStreamOptions,
    ) -> Result<LogWatch, PlatformError> {
        let (tx, watch) = LogWatch::channel(16);
        *self.logs.lock().unwrap() = Some(tx);
        Ok(watch)
    }
}
