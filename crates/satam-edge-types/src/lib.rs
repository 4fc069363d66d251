//! Wire types for the satam-edge control surface.
//!
//! Shared by the edge server (which answers these requests) and
//! `satam-edge-ctl` (which issues them).

use serde::{Deserialize, Serialize};

/// Path that accepts page-to-worker control messages.
pub const MESSAGE_PATH: &str = "/__edge/message";
/// Path that reports registration and cache storage state.
pub const STATUS_PATH: &str = "/__edge/status";
/// Response header naming where a proxied response came from.
pub const SOURCE_HEADER: &str = "x-satam-edge-source";

/// Control message kinds understood by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    SkipWaiting,
    GetVersion,
    #[serde(other)]
    Unknown,
}

/// Body of a control message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    #[serde(rename = "type")]
    pub kind: MessageType,
}

impl MessageRequest {
    pub fn new(kind: MessageType) -> Self {
        Self { kind }
    }
}

/// Reply to `GET_VERSION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub id: String,
    pub state: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub name: String,
    pub entries: usize,
}

/// Snapshot of the edge's worker generations and cache stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub controller: Option<String>,
    pub installing: Option<WorkerSummary>,
    pub waiting: Option<WorkerSummary>,
    pub active: Option<WorkerSummary>,
    /// Most recent generation that failed to install or was replaced.
    pub redundant: Option<WorkerSummary>,
    pub stores: Vec<StoreSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_uses_screaming_snake_case() {
        let body = serde_json::to_string(&MessageRequest::new(MessageType::SkipWaiting))
            .expect("serialize");
        assert_eq!(body, r#"{"type":"SKIP_WAITING"}"#);
    }

    #[test]
    fn unrecognized_message_type_parses_as_unknown() {
        let parsed: MessageRequest =
            serde_json::from_str(r#"{"type":"CLEAR_EVERYTHING"}"#).expect("parse");
        assert_eq!(parsed.kind, MessageType::Unknown);
    }
}
