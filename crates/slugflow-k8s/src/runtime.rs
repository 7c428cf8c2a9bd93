use k8s_openapi::api::core::v1::Pod;
use kube::api::PostParams;
use kube::{Api, Client};

use crate::error::Result;

/// Posts a builder pod spec and returns the created pod.
pub async fn create_pod(client: &Client, namespace: &str, pod: &Pod) -> Result<Pod> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    Ok(api.create(&PostParams::default(), pod).await?)
}

/// Exit codes of every terminated container in the pod.
pub async fn pod_exit_codes(client: &Client, namespace: &str, name: &str) -> Result<Vec<i32>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pod = api.get(name).await?;

    let codes = pod
        .status
        .and_then(|status| status.container_statuses)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|cs| cs.state.and_then(|s| s.terminated).map(|t| t.exit_code))
        .collect();
    Ok(codes)
}
