use std::time::Duration;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use satam_edge_types::{
    MessageType, StatusResponse, StoreSummary, VersionResponse, WorkerSummary,
};
use tokio::{sync::oneshot, time::timeout};

use crate::application::{GenerationInfo, error::HttpError};
use crate::domain::ControlMessage;

use super::EdgeState;

const SOURCE: &str = "infra::http::control";
const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// Deliver a page-to-worker message. `GET_VERSION` waits for the reply;
/// everything else is accepted without one.
pub(super) async fn post_message(State(state): State<EdgeState>, body: Bytes) -> Response {
    let (reply, answer) = oneshot::channel();
    let message = ControlMessage::decode(&body, Some(reply));
    let wants_reply = message.kind() == MessageType::GetVersion;

    if let Err(err) = state.registration.post_message(message).await {
        return HttpError::from(err).into_response();
    }

    if !wants_reply {
        return StatusCode::ACCEPTED.into_response();
    }

    match timeout(REPLY_TIMEOUT, answer).await {
        Ok(Ok(version)) => Json(VersionResponse { version }).into_response(),
        Ok(Err(_)) => HttpError::new(
            SOURCE,
            StatusCode::GATEWAY_TIMEOUT,
            "Worker did not reply",
            "reply channel closed before a version was sent",
        )
        .into_response(),
        Err(_) => HttpError::new(
            SOURCE,
            StatusCode::GATEWAY_TIMEOUT,
            "Worker did not reply",
            format!("no reply within {}ms", REPLY_TIMEOUT.as_millis()),
        )
        .into_response(),
    }
}

pub(super) async fn status(State(state): State<EdgeState>) -> Response {
    let registration = &state.registration;
    let stores = match registration.caches().describe().await {
        Ok(stores) => stores,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Cache storage unavailable",
                &err,
            )
            .into_response();
        }
    };

    Json(StatusResponse {
        controller: registration
            .clients()
            .controller()
            .map(|id| id.to_string()),
        installing: registration.installing().map(summary),
        waiting: registration.waiting().map(summary),
        active: registration.active().map(summary),
        redundant: registration.redundant().map(summary),
        stores: stores
            .into_iter()
            .map(|store| StoreSummary {
                name: store.name,
                entries: store.entries,
            })
            .collect(),
    })
    .into_response()
}

fn summary(info: GenerationInfo) -> WorkerSummary {
    WorkerSummary {
        id: info.id.to_string(),
        state: info.state.to_string(),
        version: info.version,
    }
}
