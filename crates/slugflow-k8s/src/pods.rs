//! Pure builder-pod spec assembly.
//!
//! No I/O here: both constructors turn validated build inputs into a
//! `Pod` value the orchestrator posts to the API server.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use k8s_openapi::api::core::v1::{
    Container, EnvVar, Pod, PodSpec, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::error::{K8sError, Result};

/// Secret holding object-storage credentials, mounted into every builder pod.
pub const OBJECT_STORE_SECRET: &str = "objectstorage-keyfile";

/// Where the object-storage credentials land inside the builder.
pub const OBJECT_STORE_MOUNT_PATH: &str = "/var/run/secrets/slugflow/objectstore/creds";

/// Where the per-app environment secret lands inside the slug builder.
pub const APP_ENV_MOUNT_PATH: &str = "/var/run/secrets/app/env";

/// Image pull policy for builder pods. Kubernetes is case-sensitive here, so
/// parsing is too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    Always,
    IfNotPresent,
    Never,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::IfNotPresent => "IfNotPresent",
            PullPolicy::Never => "Never",
        }
    }
}

impl FromStr for PullPolicy {
    type Err = K8sError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Always" => Ok(PullPolicy::Always),
            "IfNotPresent" => Ok(PullPolicy::IfNotPresent),
            "Never" => Ok(PullPolicy::Never),
            other => Err(K8sError::InvalidPullPolicy(other.to_string())),
        }
    }
}

/// Parses an operator-supplied `k:v,k:v` node selector.
///
/// Whitespace around keys and values is trimmed; an empty string is an empty
/// selector, not an error.
pub fn parse_node_selector(config: &str) -> Result<BTreeMap<String, String>> {
    let mut selector = BTreeMap::new();
    if config.is_empty() {
        return Ok(selector);
    }
    for pair in config.split(',') {
        let mut parts = pair.splitn(2, ':');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if !k.trim().is_empty() => {
                selector.insert(k.trim().to_string(), v.trim().to_string());
            }
            _ => return Err(K8sError::InvalidNodeSelector(config.to_string())),
        }
    }
    Ok(selector)
}

/// Inputs for a slug (buildpack) builder pod.
pub struct SlugBuildParams<'a> {
    pub debug: bool,
    pub pod_name: &'a str,
    pub namespace: &'a str,
    /// App config values, forwarded verbatim into the pod environment.
    pub env: &'a HashMap<String, String>,
    /// Secret carrying the same values, mounted for the buildpack to source.
    pub env_secret_name: &'a str,
    pub tar_key: &'a str,
    pub push_key: &'a str,
    /// Empty string means caching is disabled; the builder treats empty as
    /// "no cache".
    pub cache_key: &'a str,
    pub short_sha: &'a str,
    pub storage_type: &'a str,
    pub image: &'a str,
    pub pull_policy: PullPolicy,
    pub node_selector: &'a BTreeMap<String, String>,
}

/// Inputs for a container (Dockerfile) builder pod.
pub struct ContainerBuildParams<'a> {
    pub debug: bool,
    pub pod_name: &'a str,
    pub namespace: &'a str,
    pub env: &'a HashMap<String, String>,
    pub tar_key: &'a str,
    pub short_sha: &'a str,
    /// Tag the builder pushes, `{app}:git-{shortsha}` (registry-prefixed for
    /// off-cluster registries).
    pub image_name: &'a str,
    pub storage_type: &'a str,
    pub image: &'a str,
    pub registry_host: &'a str,
    pub registry_port: &'a str,
    /// Registry credentials and location, already in env-var form.
    pub registry_env: &'a HashMap<String, String>,
    pub pull_policy: PullPolicy,
    pub node_selector: &'a BTreeMap<String, String>,
}

pub fn slug_builder_pod(params: &SlugBuildParams<'_>) -> Pod {
    let mut env = base_env(params.env, params.debug, params.tar_key, params.short_sha);
    env.insert("PUT_PATH".to_string(), params.push_key.to_string());
    env.insert("CACHE_PATH".to_string(), params.cache_key.to_string());
    env.insert("BUILDER_STORAGE".to_string(), params.storage_type.to_string());

    let mut pod = builder_pod(
        params.pod_name,
        params.namespace,
        params.image,
        params.pull_policy,
        params.node_selector,
        env,
    );

    // The buildpack sources the app environment from a file mount rather
    // than the process environment.
    if let Some(spec) = pod.spec.as_mut() {
        spec.volumes.get_or_insert_with(Vec::new).push(Volume {
            name: "app-env".to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(params.env_secret_name.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        if let Some(container) = spec.containers.first_mut() {
            container
                .volume_mounts
                .get_or_insert_with(Vec::new)
                .push(VolumeMount {
                    name: "app-env".to_string(),
                    mount_path: APP_ENV_MOUNT_PATH.to_string(),
                    read_only: Some(true),
                    ..Default::default()
                });
        }
    }
    pod
}

pub fn container_builder_pod(params: &ContainerBuildParams<'_>) -> Pod {
    let mut env = base_env(params.env, params.debug, params.tar_key, params.short_sha);
    env.insert("IMG_NAME".to_string(), params.image_name.to_string());
    env.insert("BUILDER_STORAGE".to_string(), params.storage_type.to_string());
    env.insert(
        "DRYCC_REGISTRY_PROXY_HOST".to_string(),
        params.registry_host.to_string(),
    );
    env.insert(
        "DRYCC_REGISTRY_PROXY_PORT".to_string(),
        params.registry_port.to_string(),
    );
    for (k, v) in params.registry_env {
        env.insert(k.clone(), v.clone());
    }

    builder_pod(
        params.pod_name,
        params.namespace,
        params.image,
        params.pull_policy,
        params.node_selector,
        env,
    )
}

fn base_env(
    app_env: &HashMap<String, String>,
    debug: bool,
    tar_key: &str,
    short_sha: &str,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = app_env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if debug {
        env.insert("DEBUG".to_string(), "1".to_string());
    }
    env.insert("TAR_PATH".to_string(), tar_key.to_string());
    env.insert("SOURCE_VERSION".to_string(), short_sha.to_string());
    env
}

fn builder_pod(
    name: &str,
    namespace: &str,
    image: &str,
    pull_policy: PullPolicy,
    node_selector: &BTreeMap<String, String>,
    env: BTreeMap<String, String>,
) -> Pod {
    let env_vars: Vec<EnvVar> = env
        .into_iter()
        .map(|(name, value)| EnvVar {
            name,
            value: Some(value),
            value_from: None,
        })
        .collect();

    let container = Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some(pull_policy.as_str().to_string()),
        env: Some(env_vars),
        volume_mounts: Some(vec![VolumeMount {
            name: OBJECT_STORE_SECRET.to_string(),
            mount_path: OBJECT_STORE_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        }]),
        ..Default::default()
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                "heritage".to_string(),
                "slugflow".to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![container],
            restart_policy: Some("Never".to_string()),
            node_selector: if node_selector.is_empty() {
                None
            } else {
                Some(node_selector.clone())
            },
            volumes: Some(vec![Volume {
                name: OBJECT_STORE_SECRET.to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(OBJECT_STORE_SECRET.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}
