//! Upstream network adapter backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, header};
use reqwest::{Client, redirect::Policy};
use tracing::debug;
use url::Url;

use crate::application::ports::{Network, NetworkError};
use crate::domain::{FetchRequest, FetchResponse};

use super::error::InfraError;

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Performs worker fetches against the portal backend.
///
/// Requests for the controlled origin are sent to `upstream` instead, keeping
/// path and query. Any other origin is fetched as-is.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Url,
    upstream: Url,
}

impl HttpNetwork {
    pub fn new(origin: Url, upstream: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| InfraError::http(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            origin,
            upstream,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("satam-edge/", env!("CARGO_PKG_VERSION"))
    }

    /// Where a request for `url` is actually sent.
    pub fn target_url(&self, url: &Url) -> Url {
        if url.origin() != self.origin.origin() {
            return url.clone();
        }

        let mut target = self.upstream.clone();
        let prefix = self.upstream.path().trim_end_matches('/');
        target.set_path(&format!("{prefix}{}", url.path()));
        target.set_query(url.query());
        target.set_fragment(None);
        target
    }
}

fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in &HOP_BY_HOP {
        forwarded.remove(name);
    }
    forwarded
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        let target = self.target_url(request.url());
        let mut headers = end_to_end(request.headers());
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        debug!(
            target = "satam_edge::network",
            method = %request.method(),
            url = %request.url(),
            upstream = %target,
            "fetching"
        );

        let response = self
            .client
            .request(request.method().clone(), target)
            .headers(headers)
            .body(request.body().clone())
            .send()
            .await
            .map_err(|err| NetworkError::new(request.url().as_str(), err))?;

        let status = response.status();
        let mut headers = end_to_end(response.headers());
        headers.remove(header::CONTENT_LENGTH);
        let body = response
            .bytes()
            .await
            .map_err(|err| NetworkError::new(request.url().as_str(), err))?;

        Ok(FetchResponse::new(status, headers, body))
    }
}
