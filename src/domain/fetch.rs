//! Request and response values seen by the worker.
//!
//! Both carry their body as [`Bytes`], so cloning a response to store it
//! while returning the original is a reference-count bump.

use axum::http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE};
use bytes::Bytes;
use url::Url;

/// An outgoing request intercepted from a controlled page.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, mut url: Url, headers: HeaderMap, body: Bytes) -> Self {
        url.set_fragment(None);
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// A body-less GET, as issued for precached assets.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, HeaderMap::new(), Bytes::new())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Key under which responses to this request are cached.
    pub fn cache_key(&self) -> String {
        self.url.as_str().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl FetchResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}
