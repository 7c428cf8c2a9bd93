use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum K8sError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("log stream error: {0}")]
    LogStream(#[from] std::io::Error),

    #[error("invalid image pull policy '{0}' (expected Always, IfNotPresent or Never)")]
    InvalidPullPolicy(String),

    #[error("invalid node selector '{0}' (expected comma-separated k:v pairs)")]
    InvalidNodeSelector(String),

    #[error("pod {pod} did not reach {expected} within {waited:?}")]
    PodWaitTimeout {
        pod: String,
        expected: &'static str,
        waited: Duration,
    },

    #[error("secret {secret} has a non-UTF-8 value under '{key}'")]
    SecretNotUtf8 { secret: String, key: String },
}

pub type Result<T> = std::result::Result<T, K8sError>;
