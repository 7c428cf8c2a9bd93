use futures_util::{AsyncBufReadExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::LogParams;
use kube::{Api, Client};

use crate::error::Result;

/// Follows the builder pod's log and forwards each line to stdout.
///
/// Returns once the stream reaches EOF, which for a `restartPolicy: Never`
/// pod means the container finished. The caller decides what a broken
/// stream means; the pod's exit code stays authoritative.
pub async fn stream_pod_logs(client: &Client, namespace: &str, name: &str) -> Result<u64> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = LogParams {
        follow: true,
        ..Default::default()
    };

    let mut lines = api.log_stream(name, &params).await?.lines();
    let mut forwarded = 0u64;
    while let Some(line) = lines.try_next().await? {
        println!("{}", line);
        forwarded += line.len() as u64 + 1;
    }
    Ok(forwarded)
}
