use axum::{
    extract::{Request, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, Limited};
use metrics::counter;
use tracing::warn;
use url::Url;

use crate::application::{FetchDisposition, error::HttpError};
use crate::domain::FetchRequest;

use super::{EdgeState, MAX_REQUEST_BODY_BYTES, into_http_response};

const SOURCE: &str = "infra::http::proxy";

/// Every request outside the control surface is a fetch event.
pub(super) async fn proxy(State(state): State<EdgeState>, request: Request) -> Response {
    let request = match fetch_request(&state.origin, request).await {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    let Some(worker) = state.registration.controller() else {
        return passthrough(&state, &request, "no_controller").await;
    };

    match worker.handle_fetch(&request).await {
        FetchDisposition::Passthrough(reason) => {
            passthrough(&state, &request, reason.as_str()).await
        }
        FetchDisposition::Respond {
            outcome: Ok(served),
            ..
        } => into_http_response(served.response, served.source.as_str()),
        FetchDisposition::Respond {
            strategy,
            outcome: Err(err),
        } => {
            warn!(
                target = "satam_edge::http::proxy",
                url = %request.url(),
                strategy = strategy.as_str(),
                error = %err,
                "intercepted fetch failed"
            );
            HttpError::from_error(SOURCE, StatusCode::BAD_GATEWAY, "Bad gateway", &err)
                .into_response()
        }
    }
}

/// Forward a request the worker did not intercept.
async fn passthrough(state: &EdgeState, request: &FetchRequest, reason: &'static str) -> Response {
    counter!("satam_edge_passthrough_total", "reason" => reason).increment(1);

    match state.registration.network().fetch(request).await {
        Ok(response) => into_http_response(response, "passthrough"),
        Err(err) => HttpError::from_error(SOURCE, StatusCode::BAD_GATEWAY, "Bad gateway", &err)
            .into_response(),
    }
}

async fn fetch_request(origin: &Url, request: Request) -> Result<FetchRequest, HttpError> {
    let (parts, body) = request.into_parts();
    let url = request_url(origin, &parts.uri)?;
    let body = Limited::new(body, MAX_REQUEST_BODY_BYTES)
        .collect()
        .await
        .map_err(|err| {
            HttpError::from_error(
                SOURCE,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
                err.as_ref(),
            )
        })?
        .to_bytes();
    Ok(FetchRequest::new(parts.method, url, parts.headers, body))
}

/// Absolute-form targets keep their own origin; origin-form targets are
/// placed under the controlled origin.
fn request_url(origin: &Url, uri: &Uri) -> Result<Url, HttpError> {
    if uri.scheme().is_some() {
        return Url::parse(&uri.to_string()).map_err(|err| {
            HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Invalid request target", &err)
        });
    }

    let mut url = origin.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://satam.sch.id").unwrap()
    }

    #[test]
    fn origin_form_targets_resolve_against_origin() {
        let uri: Uri = "/galeri?page=2".parse().unwrap();
        let url = request_url(&origin(), &uri).expect("url");
        assert_eq!(url.as_str(), "https://satam.sch.id/galeri?page=2");
    }

    #[test]
    fn protocol_relative_looking_paths_stay_on_origin() {
        let uri: Uri = "//evil.example/steal".parse().unwrap();
        let url = request_url(&origin(), &uri).expect("url");
        assert_eq!(url.host_str(), Some("satam.sch.id"));
    }

    #[test]
    fn absolute_form_targets_keep_their_origin() {
        let uri: Uri = "https://fonts.bunny.net/css?family=figtree".parse().unwrap();
        let url = request_url(&origin(), &uri).expect("url");
        assert_eq!(url.as_str(), "https://fonts.bunny.net/css?family=figtree");
    }
}
