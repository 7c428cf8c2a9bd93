use std::collections::{BTreeMap, HashMap};

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};

use crate::error::{K8sError, Result};

/// Secret carrying private-registry credentials for off-cluster pushes.
pub const REGISTRY_SECRET: &str = "registry-secret";

/// Creates or replaces the per-app build environment secret.
pub async fn upsert_app_env_secret(
    client: &Client,
    namespace: &str,
    name: &str,
    values: &HashMap<String, String>,
) -> Result<()> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        string_data: Some(
            values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        ),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    };

    match api.create(&PostParams::default(), &secret).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            let existing = api.get(name).await?;
            let mut replacement = secret;
            replacement.metadata.resource_version = existing.metadata.resource_version;
            api.replace(name, &PostParams::default(), &replacement)
                .await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Deletes a secret; a missing secret is not an error.
pub async fn delete_secret(client: &Client, namespace: &str, name: &str) -> Result<()> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Reads the private-registry secret and exports each entry as a
/// `DRYCC_REGISTRY_{KEY}` environment variable for the container builder.
pub async fn registry_env(client: &Client, namespace: &str) -> Result<HashMap<String, String>> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api.get(REGISTRY_SECRET).await?;

    let mut env = HashMap::new();
    if let Some(data) = secret.data {
        for (key, value) in data {
            let value = String::from_utf8(value.0).map_err(|_| K8sError::SecretNotUtf8 {
                secret: REGISTRY_SECRET.to_string(),
                key: key.clone(),
            })?;
            let env_key = format!(
                "DRYCC_REGISTRY_{}",
                key.to_uppercase().replace('-', "_")
            );
            env.insert(env_key, value);
        }
    }
    Ok(env)
}
