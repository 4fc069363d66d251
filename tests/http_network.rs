use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use bytes::Bytes;
use httpmock::MockServer;
use satam_edge::application::ports::Network;
use satam_edge::domain::FetchRequest;
use satam_edge::infra::network::HttpNetwork;
use url::Url;

const ORIGIN: &str = "https://satam.sch.id";

fn network(server: &MockServer) -> HttpNetwork {
    HttpNetwork::new(
        Url::parse(ORIGIN).unwrap(),
        Url::parse(&server.base_url()).unwrap(),
        Duration::from_secs(5),
    )
    .expect("client")
}

fn request(method: Method, path: &str, body: &'static str) -> FetchRequest {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    FetchRequest::new(
        method,
        Url::parse(&format!("{ORIGIN}{path}")).unwrap(),
        headers,
        Bytes::from_static(body.as_bytes()),
    )
}

#[tokio::test]
async fn same_origin_requests_are_sent_upstream() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/galeri")
            .query_param("page", "2")
            .header("accept", "text/html");
        then.status(200)
            .header("content-type", "text/html")
            .body("<h1>Galeri</h1>");
    });

    let response = network(&server)
        .fetch(&request(Method::GET, "/galeri?page=2", ""))
        .await
        .expect("resolved");

    mock.assert();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_type(), Some("text/html"));
    assert_eq!(response.body(), &Bytes::from_static(b"<h1>Galeri</h1>"));
}

#[tokio::test]
async fn error_statuses_resolve_instead_of_rejecting() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/nilai");
        then.status(500).body("boom");
    });

    let response = network(&server)
        .fetch(&request(Method::GET, "/api/nilai", ""))
        .await
        .expect("a 500 is still a response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn request_bodies_are_forwarded() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/absensi")
            .body(r#"{"hadir":true}"#);
        then.status(201);
    });

    let response = network(&server)
        .fetch(&request(Method::POST, "/api/absensi", r#"{"hadir":true}"#))
        .await
        .expect("resolved");
    mock.assert();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn redirects_are_returned_to_the_caller() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/dashboard");
        then.status(302).header("location", "/login");
    });

    let response = network(&server)
        .fetch(&request(Method::GET, "/dashboard", ""))
        .await
        .expect("resolved");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn unreachable_upstream_rejects() {
    let network = HttpNetwork::new(
        Url::parse(ORIGIN).unwrap(),
        Url::parse("http://127.0.0.1:9").unwrap(),
        Duration::from_secs(2),
    )
    .expect("client");

    let err = network
        .fetch(&request(Method::GET, "/", ""))
        .await
        .expect_err("nothing listens on the discard port");
    assert_eq!(err.url, format!("{ORIGIN}/"));
}
