//! Request classification and the synthetic offline responses.

use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header::CONTENT_TYPE};

use crate::domain::{FetchRequest, FetchResponse};

use super::config::WorkerConfig;

pub const API_PREFIX: &str = "/api/";
pub const API_OFFLINE_BODY: &str = r#"{"error": "Network unavailable"}"#;
pub const OFFLINE_PAGE_BODY: &str = "Offline - Please check your internet connection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Network only; a JSON 503 when the network rejects.
    Api,
    /// Cache first, filling the dynamic store on a 200 miss.
    StaticAsset,
    /// Network first, falling back to the cache or an offline page.
    Page,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Api => "api",
            Strategy::StaticAsset => "static",
            Strategy::Page => "page",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    Method,
    CrossOrigin,
}

impl Bypass {
    pub fn as_str(self) -> &'static str {
        match self {
            Bypass::Method => "method",
            Bypass::CrossOrigin => "cross_origin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Bypass(Bypass),
    Intercept(Strategy),
}

/// Pick the route for a request. Rules are checked in order and the first
/// match wins.
pub fn classify(request: &FetchRequest, config: &WorkerConfig) -> Route {
    if request.method() != Method::GET {
        return Route::Bypass(Bypass::Method);
    }

    let font_host = config.is_font_host(request.url());
    if !config.is_same_origin(request.url()) && !font_host {
        return Route::Bypass(Bypass::CrossOrigin);
    }

    if request.path().starts_with(API_PREFIX) {
        return Route::Intercept(Strategy::Api);
    }

    if config.patterns.matches(request.path()) || font_host {
        return Route::Intercept(Strategy::StaticAsset);
    }

    Route::Intercept(Strategy::Page)
}

pub(crate) fn api_unavailable() -> FetchResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    FetchResponse::new(StatusCode::SERVICE_UNAVAILABLE, headers, API_OFFLINE_BODY)
}

pub(crate) fn image_not_found() -> FetchResponse {
    FetchResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "")
}

pub(crate) fn offline_page() -> FetchResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    FetchResponse::new(StatusCode::SERVICE_UNAVAILABLE, headers, OFFLINE_PAGE_BODY)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use url::Url;

    use super::*;

    fn config() -> WorkerConfig {
        WorkerConfig::new(Url::parse("https://satam.sch.id").unwrap())
    }

    fn request(method: Method, url: &str) -> FetchRequest {
        FetchRequest::new(method, Url::parse(url).unwrap(), HeaderMap::new(), Bytes::new())
    }

    #[test]
    fn non_get_requests_bypass_the_worker() {
        let config = config();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            assert_eq!(
                classify(&request(method, "https://satam.sch.id/api/students"), &config),
                Route::Bypass(Bypass::Method)
            );
        }
    }

    #[test]
    fn cross_origin_requests_bypass_unless_font_host() {
        let config = config();
        assert_eq!(
            classify(&request(Method::GET, "https://cdn.example.com/lib.js"), &config),
            Route::Bypass(Bypass::CrossOrigin)
        );
        assert_eq!(
            classify(
                &request(Method::GET, "https://fonts.bunny.net/css?family=figtree:400"),
                &config
            ),
            Route::Intercept(Strategy::StaticAsset)
        );
    }

    #[test]
    fn api_prefix_wins_over_static_patterns() {
        let config = config();
        assert_eq!(
            classify(&request(Method::GET, "https://satam.sch.id/api/posts"), &config),
            Route::Intercept(Strategy::Api)
        );
        assert_eq!(
            classify(
                &request(Method::GET, "https://satam.sch.id/api/images/photo.png"),
                &config
            ),
            Route::Intercept(Strategy::Api)
        );
        assert_eq!(
            classify(&request(Method::GET, "https://satam.sch.id/api"), &config),
            Route::Intercept(Strategy::Page)
        );
    }

    #[test]
    fn static_patterns_then_pages() {
        let config = config();
        assert_eq!(
            classify(
                &request(Method::GET, "https://satam.sch.id/build/assets/app-9c1d.js"),
                &config
            ),
            Route::Intercept(Strategy::StaticAsset)
        );
        assert_eq!(
            classify(&request(Method::GET, "https://satam.sch.id/galeri"), &config),
            Route::Intercept(Strategy::Page)
        );
    }

    #[test]
    fn synthetic_responses_are_distinguishable() {
        let api = api_unavailable();
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.content_type(), Some("application/json"));
        assert_eq!(api.body(), &Bytes::from_static(br#"{"error": "Network unavailable"}"#));

        let image = image_not_found();
        assert_eq!(image.status(), StatusCode::NOT_FOUND);
        assert!(image.body().is_empty());

        let page = offline_page();
        assert_eq!(page.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(page.content_type(), Some("text/plain"));
        assert_eq!(
            page.body(),
            &Bytes::from_static(b"Offline - Please check your internet connection")
        );
    }
}
