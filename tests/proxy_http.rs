mod support;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use satam_edge::cache::CacheStorage;
use satam_edge::infra::http::{EdgeState, build_router};
use satam_edge_types::{SOURCE_HEADER, StatusResponse, VersionResponse};
use tower::ServiceExt;

use support::{ScriptedNetwork, config, origin, registration, script_critical_assets, url};

struct Edge {
    router: Router,
    network: Arc<ScriptedNetwork>,
    storage: Arc<CacheStorage>,
}

async fn edge() -> Edge {
    let storage = Arc::new(CacheStorage::new());
    let network = ScriptedNetwork::new();
    script_critical_assets(&network);
    let registration = registration(storage.clone(), network.clone());
    registration.register(config()).await.expect("register");

    Edge {
        router: build_router(EdgeState::new(registration, origin())),
        network,
        storage,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .expect("request should build");
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

fn source(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(SOURCE_HEADER)
        .and_then(|value| value.to_str().ok())
}

async fn body(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

#[tokio::test]
async fn pages_are_proxied_and_tagged_with_their_source() {
    let edge = edge().await;
    edge.network
        .ok(&url("/galeri?page=2"), "text/html", "<h1>Galeri</h1>");

    let response = send(&edge.router, Method::GET, "/galeri?page=2", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source(&response), Some("network"));
    assert_eq!(body(response).await, b"<h1>Galeri</h1>");

    edge.network.go_offline();
    let response = send(&edge.router, Method::GET, "/galeri?page=2", "").await;
    assert_eq!(source(&response), Some("cache"));
    assert_eq!(body(response).await, b"<h1>Galeri</h1>");
}

#[tokio::test]
async fn offline_api_answers_synthetic_json() {
    let edge = edge().await;

    let response = send(&edge.router, Method::GET, "/api/pengumuman", "").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(source(&response), Some("synthetic"));
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn non_get_requests_are_passed_through() {
    let edge = edge().await;
    edge.network.respond(
        &url("/api/absensi"),
        StatusCode::CREATED,
        Some("application/json"),
        r#"{"ok":true}"#,
    );

    let response = send(&edge.router, Method::POST, "/api/absensi", r#"{"hadir":true}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(source(&response), Some("passthrough"));
    assert!(edge.storage.lookup(&url("/api/absensi")).is_none());
}

#[tokio::test]
async fn passthrough_network_failure_is_a_bad_gateway() {
    let edge = edge().await;

    let response = send(&edge.router, Method::POST, "/login", "").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn failed_static_fetch_is_a_bad_gateway() {
    let edge = edge().await;

    let response = send(&edge.router, Method::GET, "/build/assets/app-9f.js", "").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(source(&response), None);
}

#[tokio::test]
async fn absolute_form_targets_keep_their_origin() {
    let edge = edge().await;
    let font_css = "https://fonts.bunny.net/css?family=figtree:400";
    edge.network.ok(font_css, "text/css", "@font-face{}");

    let response = send(&edge.router, Method::GET, font_css, "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source(&response), Some("network"));
    assert!(edge.storage.lookup(font_css).is_some());
}

#[tokio::test]
async fn without_a_controller_everything_passes_through() {
    let storage = Arc::new(CacheStorage::new());
    let network = ScriptedNetwork::new();
    network.ok(&url("/"), "text/html", "<h1>Beranda</h1>");
    let registration = registration(storage.clone(), network.clone());
    assert!(registration.register(config()).await.is_err());
    let router = build_router(EdgeState::new(registration, origin()));

    let response = send(&router, Method::GET, "/", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source(&response), Some("passthrough"));
    assert!(storage.lookup(&url("/")).is_none());
}

#[tokio::test]
async fn get_version_message_replies_with_cache_name() {
    let edge = edge().await;

    let response = send(
        &edge.router,
        Method::POST,
        "/__edge/message",
        r#"{"type":"GET_VERSION"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let version: VersionResponse = serde_json::from_slice(&body(response).await).unwrap();
    assert_eq!(version.version, "satam-kahiji-v2");
}

#[tokio::test]
async fn other_messages_are_accepted() {
    let edge = edge().await;

    for payload in [r#"{"type":"SKIP_WAITING"}"#, r#"{"type":"PURGE"}"#, "garbage"] {
        let response = send(&edge.router, Method::POST, "/__edge/message", payload).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED, "payload {payload}");
    }
}

#[tokio::test]
async fn messages_without_a_worker_are_unavailable() {
    let registration = registration(Arc::new(CacheStorage::new()), ScriptedNetwork::new());
    let router = build_router(EdgeState::new(registration, origin()));

    let response = send(
        &router,
        Method::POST,
        "/__edge/message",
        r#"{"type":"GET_VERSION"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_reports_generations_and_stores() {
    let edge = edge().await;

    let response = send(&edge.router, Method::GET, "/__edge/status", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let status: StatusResponse = serde_json::from_slice(&body(response).await).unwrap();

    let active = status.active.expect("active worker");
    assert_eq!(active.state, "activated");
    assert_eq!(active.version, "satam-kahiji-v2");
    assert_eq!(status.controller.as_deref(), Some(active.id.as_str()));
    assert!(status.installing.is_none());
    assert!(status.waiting.is_none());
    assert!(status.redundant.is_none());
    assert_eq!(status.stores.len(), 1);
    assert_eq!(status.stores[0].name, "satam-static-v2");
    assert_eq!(status.stores[0].entries, 4);
}
