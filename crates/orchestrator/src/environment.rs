//! Builds the declarative workload description for one broker run.

use uuid::Uuid;

use broker_core::{
    ConfigObject, ContainerSpec, PluginReference, PodSpec, ResourceLimits, RuntimeIdentity, Volume,
    VolumeMount, VolumeSource, WorkloadSpec,
};

use crate::config::BrokerConfig;
use crate::error::{BrokerError, Result};

/// File name the serialized plugin reference list is mounted under.
const METADATA_FILE: &str = "config.json";
/// Pod volume name backing the metadata config object.
const METADATA_VOLUME: &str = "broker-metadata";
/// Pod volume name and mount path for the artifacts broker's plugin store.
const PLUGINS_VOLUME: &str = "plugins";
const PLUGINS_MOUNT: &str = "/plugins";
/// Orchestration platforms cap object names at 63 characters.
const MAX_CONTAINER_NAME_LEN: usize = 63;
const DIGEST_FRAGMENT_LEN: usize = 10;

const BROKER_MEMORY_LIMIT_MB: u64 = 256;
const BROKER_CPU_LIMIT_MILLIS: u64 = 500;

/// Factory output: the submit-ready workload plus the metadata config object
/// that the deliver phase creates (and deletes) on its own.
#[derive(Debug, Clone)]
pub struct BrokerEnvironment {
    pub spec: WorkloadSpec,
    pub metadata_config: ConfigObject,
}

/// Translates plugin references plus a runtime identity into a
/// [`BrokerEnvironment`]. Pure: creates nothing on the platform.
pub struct BrokerEnvironmentFactory {
    config: BrokerConfig,
}

impl BrokerEnvironmentFactory {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    pub fn create_for_metadata_broker(
        &self,
        references: &[PluginReference],
        identity: &RuntimeIdentity,
        merge_plugins: bool,
    ) -> Result<BrokerEnvironment> {
        self.build(
            &self.config.metadata_broker_image,
            false,
            references,
            identity,
            merge_plugins,
        )
    }

    /// Same builder as the metadata flavor plus the durable plugins volume
    /// the artifacts broker downloads into.
    pub fn create_for_artifacts_broker(
        &self,
        references: &[PluginReference],
        identity: &RuntimeIdentity,
        merge_plugins: bool,
    ) -> Result<BrokerEnvironment> {
        self.build(
            &self.config.artifacts_broker_image,
            true,
            references,
            identity,
            merge_plugins,
        )
    }

    fn build(
        &self,
        image: &str,
        attach_plugins_volume: bool,
        references: &[PluginReference],
        identity: &RuntimeIdentity,
        merge_plugins: bool,
    ) -> Result<BrokerEnvironment> {
        let suffix = unique_suffix();
        let config_name = format!("broker-metadata-{suffix}");
        let mount_path = format!("/broker-metadata-{suffix}");

        // serde_json performs no HTML escaping, so the payload bytes land in
        // the config object exactly as serialized.
        let payload = serde_json::to_string(references).map_err(BrokerError::serialization)?;
        let metadata_config = ConfigObject::new(&config_name).with_entry(METADATA_FILE, payload);

        let mut container = ContainerSpec::new(container_name_from_image(image), image)
            .with_pull_policy(self.config.image_pull_policy)
            .with_args(self.build_args(identity, merge_plugins, &mount_path));
        container.limits = ResourceLimits {
            memory_mb: Some(BROKER_MEMORY_LIMIT_MB),
            cpu_millis: Some(BROKER_CPU_LIMIT_MILLIS),
        };
        container
            .volume_mounts
            .push(VolumeMount::new(METADATA_VOLUME, &mount_path));

        let mut pod = PodSpec::new(format!(
            "broker-{}-{}",
            identity.workspace_id.simple(),
            suffix
        ));
        pod.volumes.push(Volume::new(
            METADATA_VOLUME,
            VolumeSource::ConfigObject {
                object_name: config_name,
            },
        ));

        if attach_plugins_volume {
            container
                .volume_mounts
                .push(VolumeMount::new(PLUGINS_VOLUME, PLUGINS_MOUNT));
            pod.volumes.push(Volume::new(
                PLUGINS_VOLUME,
                VolumeSource::Claim {
                    claim_name: format!("workspace-{}", identity.workspace_id.simple()),
                },
            ));
        }

        pod.containers.push(container);

        Ok(BrokerEnvironment {
            spec: WorkloadSpec::new(pod),
            metadata_config,
        })
    }

    /// Fixed flag order; stable so deployments are reproducible and
    /// debuggable.
    fn build_args(
        &self,
        identity: &RuntimeIdentity,
        merge_plugins: bool,
        mount_path: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "--push-endpoint".to_string(),
            self.config.push_endpoint.clone(),
            "--runtime-id".to_string(),
            identity.runtime_id(),
        ];
        if let Some(path) = &self.config.ca_bundle_path {
            args.push("--cacert".to_string());
            args.push(path.clone());
        }
        args.push("--registry-address".to_string());
        args.push(self.config.registry_url.clone());
        if let Some(dir) = &self.config.ca_dir {
            args.push("--cadir".to_string());
            args.push(dir.clone());
        }
        if merge_plugins {
            args.push("--merge-plugins".to_string());
        }
        args.push("--metas".to_string());
        args.push(format!("{mount_path}/{METADATA_FILE}"));
        args
    }
}

fn unique_suffix() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Derive a platform-legal container name from an image reference.
///
/// Registry and organization segments are stripped, an `@algo:digest` suffix
/// is shortened to the first ten hex characters of the digest, anything
/// non-alphanumeric folds to `-` and the result is capped at 63 characters.
/// Pure and deterministic: one image reference, one name.
pub fn container_name_from_image(image: &str) -> String {
    let (reference, digest) = match image.split_once('@') {
        Some((reference, digest)) => (reference, Some(digest)),
        None => (image, None),
    };

    let last_segment = reference.rsplit('/').next().unwrap_or(reference);
    let raw = match digest {
        Some(digest) => {
            let hex = digest
                .split_once(':')
                .map(|(_, hex)| hex)
                .unwrap_or(digest);
            let fragment: String = hex.chars().take(DIGEST_FRAGMENT_LEN).collect();
            format!("{last_segment}-{fragment}")
        }
        None => last_segment.to_string(),
    };

    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    name.truncate(MAX_CONTAINER_NAME_LEN);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn identity() -> RuntimeIdentity {
        RuntimeIdentity::new(Uuid::new_v4(), "default", "che")
    }

    fn references() -> Vec<PluginReference> {
        vec![
            PluginReference::new("redhat", "java", "0.57.0"),
            PluginReference::new("ms-python", "python", "2020.3.1"),
        ]
    }

    #[test]
    fn test_metadata_broker_spec_shape() {
        let factory = BrokerEnvironmentFactory::new(BrokerConfig::default());
        let env = factory
            .create_for_metadata_broker(&references(), &identity(), false)
            .unwrap();

        assert_eq!(env.spec.pod.containers.len(), 1);
        let container = &env.spec.pod.containers[0];
        assert_eq!(container.image, BrokerConfig::default().metadata_broker_image);
        // Metadata flavor has no plugins volume.
        assert_eq!(env.spec.pod.volumes.len(), 1);
        assert_eq!(container.volume_mounts.len(), 1);
    }

    #[test]
    fn test_artifacts_broker_attaches_plugins_volume() {
        let factory = BrokerEnvironmentFactory::new(BrokerConfig::default());
        let env = factory
            .create_for_artifacts_broker(&references(), &identity(), false)
            .unwrap();

        let container = &env.spec.pod.containers[0];
        assert_eq!(container.image, BrokerConfig::default().artifacts_broker_image);
        assert!(container
            .volume_mounts
            .iter()
            .any(|m| m.name == "plugins" && m.mount_path == "/plugins"));
        assert!(env
            .spec
            .pod
            .volumes
            .iter()
            .any(|v| matches!(v.source, VolumeSource::Claim { .. })));
    }

    #[test]
    fn test_generated_names_never_collide() {
        let factory = BrokerEnvironmentFactory::new(BrokerConfig::default());
        let identity = identity();

        let mut config_names = HashSet::new();
        let mut pod_names = HashSet::new();
        for _ in 0..64 {
            let env = factory
                .create_for_metadata_broker(&references(), &identity, false)
                .unwrap();
            assert!(config_names.insert(env.metadata_config.name.clone()));
            assert!(pod_names.insert(env.spec.pod.name.clone()));
        }
    }

    #[test]
    fn test_payload_is_exact_serialization() {
        let factory = BrokerEnvironmentFactory::new(BrokerConfig::default());
        let references = references();
        let env = factory
            .create_for_metadata_broker(&references, &identity(), false)
            .unwrap();

        let expected = serde_json::to_string(&references).unwrap();
        assert_eq!(env.metadata_config.data.get("config.json"), Some(&expected));
    }

    #[test]
    fn test_command_line_order_and_metas_flag() {
        let config = BrokerConfig {
            ca_bundle_path: Some("/etc/ssl/ca.crt".to_string()),
            ca_dir: Some("/public-certs".to_string()),
            ..BrokerConfig::default()
        };
        let push_endpoint = config.push_endpoint.clone();
        let registry_url = config.registry_url.clone();
        let identity = identity();
        let factory = BrokerEnvironmentFactory::new(config);

        let env = factory
            .create_for_metadata_broker(&references(), &identity, true)
            .unwrap();
        let args = &env.spec.pod.containers[0].args;

        let mount = env.metadata_config.name.clone();
        let expected = vec![
            "--push-endpoint".to_string(),
            push_endpoint,
            "--runtime-id".to_string(),
            identity.runtime_id(),
            "--cacert".to_string(),
            "/etc/ssl/ca.crt".to_string(),
            "--registry-address".to_string(),
            registry_url,
            "--cadir".to_string(),
            "/public-certs".to_string(),
            "--merge-plugins".to_string(),
            "--metas".to_string(),
            format!("/{mount}/config.json"),
        ];
        assert_eq!(args, &expected);
    }

    #[test]
    fn test_optional_flags_absent_by_default() {
        let factory = BrokerEnvironmentFactory::new(BrokerConfig::default());
        let env = factory
            .create_for_metadata_broker(&references(), &identity(), false)
            .unwrap();
        let args = &env.spec.pod.containers[0].args;

        assert!(!args.contains(&"--cacert".to_string()));
        assert!(!args.contains(&"--cadir".to_string()));
        assert!(!args.contains(&"--merge-plugins".to_string()));
        assert!(args.contains(&"--metas".to_string()));
    }

    #[test]
    fn test_container_name_strips_registry_and_tag() {
        assert_eq!(
            container_name_from_image("quay.io/eclipse/plugin-metadata-broker:v3.4.0"),
            "plugin-metadata-broker-v3-4-0"
        );
    }

    #[test]
    fn test_container_name_shortens_digest() {
        let name = container_name_from_image(
            "docker.io/library/broker@sha256:7897c1f2a68d58b30f32e42a358377be0b22a36cfc8c1a218da67cbd8b93a13f",
        );
        assert_eq!(name, "broker-7897c1f2a6");
        assert!(!name.contains("sha256"));
        assert!(name.len() <= 63);
    }

    #[test]
    fn test_container_name_truncates_to_limit() {
        let long = format!("registry.local/org/{}:latest", "x".repeat(120));
        let name = container_name_from_image(&long);
        assert_eq!(name.len(), 63);
    }

    #[test]
    fn test_container_name_is_deterministic() {
        let image = "quay.io/eclipse/plugin-metadata-broker@sha256:abcdef0123456789";
        assert_eq!(
            container_name_from_image(image),
            container_name_from_image(image)
        );
    }
}
