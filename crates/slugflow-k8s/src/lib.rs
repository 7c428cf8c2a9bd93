//! Kubernetes plumbing for the build engine.
//!
//! Builder pods are single-shot: one container, `restartPolicy: Never`, all
//! build inputs injected as environment variables, object-storage credentials
//! mounted from a well-known secret. This crate assembles those pod specs,
//! watches their lifecycle through a reflector cache, and handles the
//! secrets and log streams around them.

pub mod error;
pub mod logs;
pub mod pods;
pub mod runtime;
pub mod secrets;
pub mod watcher;

pub use error::{K8sError, Result};
pub use logs::stream_pod_logs;
pub use pods::{
    container_builder_pod, parse_node_selector, slug_builder_pod, ContainerBuildParams,
    PullPolicy, SlugBuildParams, APP_ENV_MOUNT_PATH, OBJECT_STORE_MOUNT_PATH,
    OBJECT_STORE_SECRET,
};
pub use runtime::{create_pod, pod_exit_codes};
pub use secrets::{delete_secret, registry_env, upsert_app_env_secret, REGISTRY_SECRET};
pub use watcher::PodWatcher;
