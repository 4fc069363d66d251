mod control;
mod middleware;
mod proxy;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Response},
    middleware as axum_middleware,
    routing::{get, post},
};
use satam_edge_types::{MESSAGE_PATH, SOURCE_HEADER, STATUS_PATH};
use url::Url;

use crate::application::WorkerRegistration;
use crate::domain::FetchResponse;

use middleware::{log_responses, set_request_context};

/// Largest request body the proxy buffers before handing it to the worker.
pub const MAX_REQUEST_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct EdgeState {
    pub registration: Arc<WorkerRegistration>,
    /// Origin-form request targets are resolved against this origin.
    pub origin: Url,
}

impl EdgeState {
    pub fn new(registration: Arc<WorkerRegistration>, origin: Url) -> Self {
        Self {
            registration,
            origin,
        }
    }
}

pub fn build_router(state: EdgeState) -> Router {
    Router::new()
        .route(MESSAGE_PATH, post(control::post_message))
        .route(STATUS_PATH, get(control::status))
        .fallback(proxy::proxy)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Turn a worker response into an HTTP response tagged with its source.
fn into_http_response(response: FetchResponse, source: &'static str) -> Response<Body> {
    let (status, headers, body) = response.into_parts();
    let mut http = Response::new(Body::from(body));
    *http.status_mut() = status;
    *http.headers_mut() = headers;
    http.headers_mut()
        .insert(SOURCE_HEADER, HeaderValue::from_static(source));
    http
}
