use serde::{Deserialize, Serialize};

use crate::domain::workload::{EnvVar, ResourceLimits, VolumeMount};
use crate::error::CoreError;

/// Progress states a broker reports over the event bus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrokerStatus {
    Started,
    Done,
    Failed,
}

impl BrokerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(Self::Started),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether this status ends the broker run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Fully-qualified identifier of a requested plugin.
///
/// Supplied by the caller and never mutated; the canonical form is
/// `publisher/name/version`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PluginReference {
    pub publisher: String,
    pub name: String,
    pub version: String,
}

impl PluginReference {
    pub fn new(
        publisher: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher: publisher.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Canonical `publisher/name/version` id.
    pub fn id(&self) -> String {
        format!("{}/{}/{}", self.publisher, self.name, self.version)
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(publisher), Some(name), Some(version), None)
                if !publisher.is_empty() && !name.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(publisher, name, version))
            }
            _ => Err(CoreError::InvalidPluginReference(s.to_string())),
        }
    }
}

impl std::fmt::Display for PluginReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Runtime container description for one resolved plugin.
///
/// Produced by the broker process and transported to the caller unchanged;
/// the pipeline never inspects it beyond the structural validation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedPlugin {
    /// Canonical plugin id (`publisher/name/version`).
    pub id: String,
    /// Container image the plugin runs from.
    pub image: String,
    /// Container entrypoint override, if any.
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub limits: ResourceLimits,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
}

impl ResolvedPlugin {
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
            commands: Vec::new(),
            env: Vec::new(),
            limits: ResourceLimits::default(),
            volume_mounts: Vec::new(),
        }
    }

    /// Structural check applied before a result is handed to the caller.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.is_empty() {
            return Err(CoreError::Validation(
                "resolved plugin has an empty id".to_string(),
            ));
        }
        if self.image.is_empty() {
            return Err(CoreError::Validation(format!(
                "resolved plugin '{}' has an empty image",
                self.id
            )));
        }
        Ok(())
    }
}
