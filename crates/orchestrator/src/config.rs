use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use broker_core::PullPolicy;

/// Knobs for one broker deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Endpoint the broker pushes status/result events to.
    pub push_endpoint: String,
    /// Plugin registry the broker resolves references against.
    pub registry_url: String,
    /// Image for the metadata-resolving broker flavor.
    pub metadata_broker_image: String,
    /// Image for the artifact-downloading broker flavor.
    pub artifacts_broker_image: String,
    pub image_pull_policy: PullPolicy,
    /// CA bundle handed to the broker via `--cacert`, if set.
    pub ca_bundle_path: Option<String>,
    /// Trust-store directory handed to the broker via `--cadir`, if set.
    pub ca_dir: Option<String>,
    /// Bound on the wait for the broker's result.
    pub wait_timeout_minutes: u64,
    /// Bound on durable-volume preparation.
    pub storage_timeout_millis: u64,
    /// Byte budget for a followed container log stream.
    pub log_limit_bytes: u64,
    /// Stream broker container logs onto the event bus.
    pub debug_logs: bool,
    /// Fail the result future early on unrecoverable pod lifecycle events.
    pub fail_fast_on_unrecoverable_events: bool,
    /// Structurally validate resolved plugins before completing the future.
    pub validate_plugins: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            push_endpoint: "http://localhost:8080/broker/events".to_string(),
            registry_url: "https://registry.local/plugins/v3".to_string(),
            metadata_broker_image: "registry.local/plugin-broker/metadata:latest".to_string(),
            artifacts_broker_image: "registry.local/plugin-broker/artifacts:latest".to_string(),
            image_pull_policy: PullPolicy::default(),
            ca_bundle_path: None,
            ca_dir: None,
            wait_timeout_minutes: 3,
            storage_timeout_millis: 120_000,
            log_limit_bytes: 10 * 1024 * 1024,
            debug_logs: false,
            fail_fast_on_unrecoverable_events: false,
            validate_plugins: true,
        }
    }
}

impl BrokerConfig {
    /// Read config from a file, falling back to defaults when the file is
    /// missing or unparseable.
    pub async fn read(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "Config loaded successfully");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }

    /// Write config to a file, creating parent directories as needed.
    pub async fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(path, content).await?;
        debug!(path = %path.display(), "Config saved successfully");

        Ok(())
    }
}
