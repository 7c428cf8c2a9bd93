//! Operator configuration, read from the environment.
//!
//! Variable names are fixed for compatibility with existing installs; every
//! malformed value fails the build up front as invalid configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use slugflow_k8s::{parse_node_selector, PullPolicy};

use crate::error::{BuildError, Result};
use crate::stack::Stack;

/// Stacks offered when the operator does not configure `DRYCC_STACKS`.
const DEFAULT_STACKS: &str = r#"[
  {"name": "container", "image": "registry.drycc.cc/drycc/dockerbuilder:canary"},
  {"name": "heroku-18", "image": "registry.drycc.cc/drycc/slugbuilder:canary"}
]"#;

#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret authenticating hook calls to the controller.
    pub builder_key: String,
    /// Namespace builder pods and secrets live in.
    pub pod_namespace: String,
    /// Storage driver label handed to builder pods verbatim.
    pub storage_type: String,
    /// Root of the filesystem-backed object store.
    pub storage_root: PathBuf,
    pub controller_host: String,
    pub controller_port: u16,
    pub registry_location: String,
    pub registry_host: String,
    pub registry_port: String,
    pub slugbuilder_pull_policy: PullPolicy,
    pub dockerbuilder_pull_policy: PullPolicy,
    pub node_selector: BTreeMap<String, String>,
    /// Heartbeat period for the idle progress ticker.
    pub session_idle_interval: Duration,
    /// Pod watch poll granularity.
    pub pod_tick: Duration,
    /// Upper bound for each pod lifecycle wait.
    pub pod_wait: Duration,
    pub stacks: Vec<Stack>,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any name→value lookup. Tests feed maps in
    /// here; `from_env` feeds the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            get(key).ok_or_else(|| BuildError::ConfigInvalid(format!("{} is not set", key)))
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let pull_policy = |key: &str| -> Result<PullPolicy> {
            or(key, "IfNotPresent")
                .parse()
                .map_err(|e: slugflow_k8s::K8sError| BuildError::ConfigInvalid(e.to_string()))
        };
        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => raw.parse().map(Duration::from_secs).map_err(|_| {
                    BuildError::ConfigInvalid(format!("{} is not a number of seconds: {}", key, raw))
                }),
            }
        };

        let controller_port = or("DRYCC_CONTROLLER_SERVICE_PORT", "8000")
            .parse::<u16>()
            .map_err(|_| {
                BuildError::ConfigInvalid("DRYCC_CONTROLLER_SERVICE_PORT is not a port".to_string())
            })?;

        let stacks_raw = or("DRYCC_STACKS", DEFAULT_STACKS);
        let stacks: Vec<Stack> = serde_json::from_str(&stacks_raw)
            .map_err(|e| BuildError::ConfigInvalid(format!("DRYCC_STACKS is malformed: {}", e)))?;

        let node_selector = parse_node_selector(&or("BUILDER_POD_NODE_SELECTOR", ""))
            .map_err(|e| BuildError::ConfigInvalid(e.to_string()))?;

        Ok(Self {
            builder_key: required("DRYCC_BUILDER_KEY")?,
            pod_namespace: required("POD_NAMESPACE")?,
            storage_type: or("BUILDER_STORAGE", "minio"),
            storage_root: PathBuf::from(or("BUILDER_STORAGE_ROOT", "/var/lib/slugflow/objects")),
            controller_host: or("DRYCC_CONTROLLER_SERVICE_HOST", "127.0.0.1"),
            controller_port,
            registry_location: or("DRYCC_REGISTRY_LOCATION", "on-cluster"),
            registry_host: or("DRYCC_REGISTRY_PROXY_HOST", "127.0.0.1"),
            registry_port: or("DRYCC_REGISTRY_PROXY_PORT", "5555"),
            slugbuilder_pull_policy: pull_policy("SLUGBUILDER_IMAGE_PULL_POLICY")?,
            dockerbuilder_pull_policy: pull_policy("DOCKERBUILDER_IMAGE_PULL_POLICY")?,
            node_selector,
            session_idle_interval: seconds("SESSION_IDLE_INTERVAL", 10)?,
            pod_tick: seconds("BUILDER_POD_TICK_DURATION", 1)?,
            pod_wait: seconds("BUILDER_POD_WAIT_DURATION", 600)?,
            stacks,
            debug: get("DEBUG").is_some_and(|v| v == "1" || v == "true"),
        })
    }
}
