pub mod domain;
pub mod error;

pub use domain::identity::RuntimeIdentity;
pub use domain::plugin::{BrokerStatus, PluginReference, ResolvedPlugin};
pub use domain::workload::{
    ConfigObject, ContainerSpec, EnvVar, PodSpec, PullPolicy, ResourceLimits, RestartPolicy,
    SecretObject, Volume, VolumeMount, VolumeSource, WorkloadSpec,
};
pub use error::CoreError;
