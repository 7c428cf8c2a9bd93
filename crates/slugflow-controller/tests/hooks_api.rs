//! Hooks client tests against an in-process fake controller.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use slugflow_controller::{ControllerClient, ControllerError};

#[derive(Clone, Default)]
struct Captured {
    auth: Arc<Mutex<Option<String>>>,
    query: Arc<Mutex<Option<std::collections::HashMap<String, String>>>>,
    body: Arc<Mutex<Option<serde_json::Value>>>,
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn version_header(version: &'static str) -> [(HeaderName, &'static str); 1] {
    [(HeaderName::from_static("drycc_api_version"), version)]
}

#[tokio::test]
async fn get_app_config_sends_auth_and_parses_values() {
    let captured = Captured::default();
    let router = Router::new().route(
        "/v2/hooks/config",
        get(
            |State(c): State<Captured>,
             headers: HeaderMap,
             Query(q): Query<std::collections::HashMap<String, String>>| async move {
                *c.auth.lock().unwrap() = headers
                    .get("x-drycc-builder-auth")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *c.query.lock().unwrap() = Some(q);
                (
                    version_header("2.3"),
                    Json(serde_json::json!({
                        "values": {"DRYCC_DISABLE_CACHE": "1", "FOO": "bar"}
                    })),
                )
            },
        )
        .with_state(captured.clone()),
    );
    let addr = spawn(router).await;

    let client = ControllerClient::new(&addr.ip().to_string(), addr.port(), "sekrit");
    let config = client.get_app_config("alice", "foo").await.unwrap();

    assert_eq!(config.value("FOO"), Some("bar"));
    assert!(config.has("DRYCC_DISABLE_CACHE"));
    assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("sekrit"));
    let query = captured.query.lock().unwrap().clone().unwrap();
    assert_eq!(query.get("receive_user").map(String::as_str), Some("alice"));
    assert_eq!(query.get("receive_repo").map(String::as_str), Some("foo"));
}

#[tokio::test]
async fn create_build_posts_hook_body_and_returns_version() {
    let captured = Captured::default();
    let router = Router::new().route(
        "/v2/hooks/build",
        post(
            |State(c): State<Captured>, Json(body): Json<serde_json::Value>| async move {
                *c.body.lock().unwrap() = Some(body);
                (
                    version_header("2.3"),
                    Json(serde_json::json!({"release": {"version": 7}})),
                )
            },
        )
        .with_state(captured.clone()),
    );
    let addr = spawn(router).await;

    let client = ControllerClient::new(&addr.ip().to_string(), addr.port(), "sekrit");
    let mut procfile = BTreeMap::new();
    procfile.insert("web".to_string(), "bundle exec".to_string());

    let version = client
        .create_build(
            "alice",
            "foo",
            "home/foo:git-abc12345/push/slug.tgz",
            "heroku-18",
            "abc12345",
            &procfile,
            false,
        )
        .await
        .unwrap();

    assert_eq!(version, 7);
    let body = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(body["receive_user"], "alice");
    assert_eq!(body["receive_repo"], "foo");
    assert_eq!(body["image"], "home/foo:git-abc12345/push/slug.tgz");
    assert_eq!(body["stack"], "heroku-18");
    assert_eq!(body["sha"], "abc12345");
    assert_eq!(body["procfile"]["web"], "bundle exec");
    assert_eq!(body["container"], false);
}

#[tokio::test]
async fn api_version_skew_is_downgraded_to_success() {
    let router = Router::new().route(
        "/v2/hooks/config",
        get(|| async {
            (
                version_header("99.9"),
                Json(serde_json::json!({"values": {}})),
            )
        }),
    );
    let addr = spawn(router).await;

    let client = ControllerClient::new(&addr.ip().to_string(), addr.port(), "sekrit");
    // The skew is warned about, not surfaced as an error.
    let config = client.get_app_config("alice", "foo").await.unwrap();
    assert!(config.values.is_empty());
}

#[tokio::test]
async fn controller_rejection_is_an_api_error() {
    let router = Router::new().route(
        "/v2/hooks/build",
        post(|| async { (StatusCode::FORBIDDEN, "bad builder key") }),
    );
    let addr = spawn(router).await;

    let client = ControllerClient::new(&addr.ip().to_string(), addr.port(), "wrong");
    let err = client
        .create_build("alice", "foo", "img", "heroku-18", "abc12345", &BTreeMap::new(), false)
        .await
        .unwrap_err();

    match err {
        ControllerError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "bad builder key");
        }
        other => panic!("expected Api error, got {other}"),
    }
}
