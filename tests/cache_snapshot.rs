mod support;

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};
use bytes::Bytes;
use satam_edge::cache::{CacheError, CacheStorage, CachedResponse};
use satam_edge::domain::FetchResponse;
use tempfile::TempDir;

use support::{ScriptedNetwork, config, registration, script_critical_assets, url};

fn html(body: &'static str) -> CachedResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    CachedResponse::from_response(&FetchResponse::new(StatusCode::OK, headers, body))
}

#[tokio::test]
async fn missing_snapshot_loads_empty_storage() {
    let dir = TempDir::new().expect("tempdir");
    let storage = CacheStorage::load_snapshot(&dir.path().join("caches.json"))
        .await
        .expect("missing file is empty storage");
    assert!(storage.names().is_empty());
}

#[tokio::test]
async fn snapshot_keeps_stores_in_order_with_binary_bodies() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("caches.json");

    let storage = CacheStorage::new();
    storage.open("satam-kahiji-v1").put(url("/"), html("<h1>v1</h1>"));
    storage.open("satam-static-v2").put(
        url("/logo-satam.png"),
        CachedResponse::from_response(&FetchResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x00, 0xff]),
        )),
    );
    storage.write_snapshot(&path).await.expect("write");

    let restored = CacheStorage::load_snapshot(&path).await.expect("load");
    assert_eq!(restored.names(), vec!["satam-kahiji-v1", "satam-static-v2"]);

    let page = restored.lookup(&url("/")).expect("page entry");
    assert_eq!(page.to_response().content_type(), Some("text/html"));
    let logo = restored.lookup(&url("/logo-satam.png")).expect("logo entry");
    assert_eq!(logo.body, Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x00, 0xff]));
}

#[tokio::test]
async fn corrupt_snapshot_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("caches.json");
    tokio::fs::write(&path, b"{ not json").await.expect("write");

    let err = CacheStorage::load_snapshot(&path)
        .await
        .expect_err("corrupt snapshot");
    assert!(matches!(err, CacheError::SnapshotFormat { .. }));
}

#[tokio::test]
async fn restored_previous_generation_is_purged_on_activation() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("caches.json");

    let previous = CacheStorage::new();
    previous.open("satam-kahiji-v1").put(url("/"), html("<h1>old</h1>"));
    previous.open("satam-static-v1").put(url("/favicon.ico"), html("old"));
    previous.write_snapshot(&path).await.expect("write");

    let storage = Arc::new(CacheStorage::load_snapshot(&path).await.expect("load"));
    let network = ScriptedNetwork::new();
    script_critical_assets(&network);
    registration(storage.clone(), network)
        .register(config())
        .await
        .expect("register");

    assert_eq!(storage.names(), vec!["satam-static-v2"]);
    assert!(storage.lookup(&url("/")).is_none());
}
