//! End-to-end pipeline scenarios.
//!
//! These drive the real orchestrator against whatever cluster the ambient
//! kubeconfig points at, with an in-memory object store and an in-process
//! fake controller. They are ignored by default because they need a
//! Kubernetes cluster (kind is fine) plus the git CLI.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::{Json, Router};
use slugflow_build::{BuildError, BuildRequest, Builder, Config};
use slugflow_controller::ControllerClient;
use slugflow_storage::MemoryStorage;
use tokio_util::sync::CancellationToken;

const NAMESPACE: &str = "default";

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(repo)
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// Bare-ish repo with a Procfile commit; returns the full sha.
fn seed_repo(repo: &Path) -> String {
    git(repo, &["init", "-q"]);
    git(repo, &["config", "user.email", "ci@example.com"]);
    git(repo, &["config", "user.name", "ci"]);
    std::fs::write(repo.join("Procfile"), "web: bundle exec\n").unwrap();
    git(repo, &["add", "."]);
    git(repo, &["commit", "-q", "-m", "seed"]);
    let output = Command::new("git")
        .current_dir(repo)
        .args(["rev-parse", "HEAD"])
        .output()
        .unwrap();
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// Fake controller: empty app config, every build becomes release v1, and
/// the API version header is deliberately skewed (the engine must only warn).
async fn spawn_controller() -> SocketAddr {
    let version = || [(HeaderName::from_static("drycc_api_version"), "99.9")];
    let router = Router::new()
        .route(
            "/v2/hooks/config",
            get(move || async move { (version(), Json(serde_json::json!({"values": {}}))) }),
        )
        .route(
            "/v2/hooks/build",
            post(move || async move {
                (
                    version(),
                    Json(serde_json::json!({"release": {"version": 1}})),
                )
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn config_for(controller: SocketAddr, builder_image: &str, wait_secs: u64) -> Config {
    let env = HashMap::from([
        ("DRYCC_BUILDER_KEY".to_string(), "sekrit".to_string()),
        ("POD_NAMESPACE".to_string(), NAMESPACE.to_string()),
        (
            "DRYCC_CONTROLLER_SERVICE_HOST".to_string(),
            controller.ip().to_string(),
        ),
        (
            "DRYCC_CONTROLLER_SERVICE_PORT".to_string(),
            controller.port().to_string(),
        ),
        (
            "DRYCC_STACKS".to_string(),
            format!(r#"[{{"name": "heroku-18", "image": "{}"}}]"#, builder_image),
        ),
        ("BUILDER_POD_WAIT_DURATION".to_string(), wait_secs.to_string()),
        ("BUILDER_POD_TICK_DURATION".to_string(), "1".to_string()),
    ]);
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

/// The builder pods mount this secret; make sure it exists in the cluster.
async fn ensure_objectstore_secret(client: &kube::Client) {
    slugflow_k8s::upsert_app_env_secret(
        client,
        NAMESPACE,
        slugflow_k8s::OBJECT_STORE_SECRET,
        &HashMap::from([("accesskey".to_string(), "test".to_string())]),
    )
    .await
    .unwrap();
}

async fn secret_exists(client: &kube::Client, name: &str) -> bool {
    use k8s_openapi::api::core::v1::Secret;
    let api: kube::Api<Secret> = kube::Api::namespaced(client.clone(), NAMESPACE);
    api.get(name).await.is_ok()
}

/// Builder pods are left behind on purpose; clear the name before a rerun.
async fn remove_stale_pod(client: &kube::Client, name: &str) {
    use k8s_openapi::api::core::v1::Pod;
    let api: kube::Api<Pod> = kube::Api::namespaced(client.clone(), NAMESPACE);
    let _ = api.delete(name, &kube::api::DeleteParams::default()).await;
    for _ in 0..30 {
        if api.get(name).await.is_err() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster and git"]
async fn buildpack_happy_path_publishes_a_release() {
    let controller_addr = spawn_controller().await;
    // The stock busybox entrypoint exits 0 immediately, which is all the
    // engine needs to see a successful builder.
    let config = config_for(controller_addr, "busybox:latest", 120);

    let kube = kube::Client::try_default().await.unwrap();
    ensure_objectstore_secret(&kube).await;

    let repo = tempfile::tempdir().unwrap();
    let sha = seed_repo(repo.path());
    let short = &sha[..8];
    remove_stale_pod(&kube, &format!("slug-itfoo-{}", short)).await;

    let storage = MemoryStorage::new();
    let controller = ControllerClient::new(
        &controller_addr.ip().to_string(),
        controller_addr.port(),
        "sekrit",
    );
    let builder = Builder::new(config, Arc::new(storage.clone()), controller, kube.clone());

    let request = BuildRequest {
        app: "itfoo".to_string(),
        user: "alice".to_string(),
        sha: sha.clone(),
        repo_dir: repo.path().to_path_buf(),
    };
    let version = builder
        .build(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(version, 1);

    // Tarball staged under the published key layout.
    assert!(storage.contains(&format!("home/itfoo:git-{}/tar", short)));
    // Temp dir and env secret are gone on the success path too.
    assert!(std::fs::read_dir(repo.path().join("build")).unwrap().next().is_none());
    assert!(!secret_exists(&kube, "itfoo-build-env").await);
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster and git"]
async fn unstartable_builder_times_out_and_cleans_up() {
    let controller_addr = spawn_controller().await;
    // An unpullable image keeps the pod Pending until the wait bound trips.
    let config = config_for(controller_addr, "example.invalid/builder:none", 20);

    let kube = kube::Client::try_default().await.unwrap();
    ensure_objectstore_secret(&kube).await;

    let repo = tempfile::tempdir().unwrap();
    let sha = seed_repo(repo.path());
    remove_stale_pod(&kube, &format!("slug-itbar-{}", &sha[..8])).await;

    let storage = MemoryStorage::new();
    let controller = ControllerClient::new(
        &controller_addr.ip().to_string(),
        controller_addr.port(),
        "sekrit",
    );
    let builder = Builder::new(config, Arc::new(storage.clone()), controller, kube.clone());

    let request = BuildRequest {
        app: "itbar".to_string(),
        user: "alice".to_string(),
        sha,
        repo_dir: repo.path().to_path_buf(),
    };
    let err = builder
        .build(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::BuilderStartTimeout(_)));

    // Cleanups ran: no temp dir, no env secret. The pod itself is left
    // behind for debugging.
    assert!(std::fs::read_dir(repo.path().join("build")).unwrap().next().is_none());
    assert!(!secret_exists(&kube, "itbar-build-env").await);
}
