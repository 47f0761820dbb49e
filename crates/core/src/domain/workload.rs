//! Declarative description of a broker workload and its supporting objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::IfNotPresent => "if_not_present",
            Self::Never => "never",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Self::Always),
            "if_not_present" => Some(Self::IfNotPresent),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    Always,
    OnFailure,
    #[default]
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ResourceLimits {
    /// Memory limit in mebibytes.
    pub memory_mb: Option<u64>,
    /// CPU limit in millicores.
    pub cpu_millis: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

impl VolumeMount {
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mount_path: mount_path.into(),
        }
    }
}

/// Backing source for a pod volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum VolumeSource {
    EmptyDir,
    /// Projected from a config object created for this run.
    ConfigObject { object_name: String },
    /// Durable storage claim prepared by the storage provisioner.
    Claim { claim_name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

impl Volume {
    pub fn new(name: impl Into<String>, source: VolumeSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// One container of the broker pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub pull_policy: PullPolicy,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
    pub limits: ResourceLimits,
    pub volume_mounts: Vec<VolumeMount>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            pull_policy: PullPolicy::default(),
            args: Vec::new(),
            env: Vec::new(),
            limits: ResourceLimits::default(),
            volume_mounts: Vec::new(),
        }
    }

    pub fn with_pull_policy(mut self, policy: PullPolicy) -> Self {
        self.pull_policy = policy;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// The broker pod: a single short-lived container plus its volumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodSpec {
    pub name: String,
    pub containers: Vec<ContainerSpec>,
    pub volumes: Vec<Volume>,
    pub restart_policy: RestartPolicy,
}

impl PodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: Vec::new(),
            volumes: Vec::new(),
            restart_policy: RestartPolicy::Never,
        }
    }
}

/// Key/value config object mounted into or referenced by the pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigObject {
    pub name: String,
    pub data: BTreeMap<String, String>,
}

impl ConfigObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretObject {
    pub name: String,
    pub data: BTreeMap<String, String>,
}

impl SecretObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Everything needed to run one broker instance for one workspace.
///
/// Built once by the environment factory, consumed once by the deploy phase,
/// never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub pod: PodSpec,
    pub config_objects: Vec<ConfigObject>,
    pub secrets: Vec<SecretObject>,
}

impl WorkloadSpec {
    pub fn new(pod: PodSpec) -> Self {
        Self {
            pod,
            config_objects: Vec::new(),
            secrets: Vec::new(),
        }
    }

    pub fn with_config_object(mut self, object: ConfigObject) -> Self {
        self.config_objects.push(object);
        self
    }

    pub fn with_secret(mut self, secret: SecretObject) -> Self {
        self.secrets.push(secret);
        self
    }

    /// Name of the pod this spec will submit.
    pub fn pod_name(&self) -> &str {
        &self.pod.name
    }
}
