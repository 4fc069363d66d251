//! Page-to-worker control messages.

use satam_edge_types::{MessageRequest, MessageType};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum ControlMessage {
    /// Leave the waiting state and activate now.
    SkipWaiting,
    /// Ask for the dynamic cache name; answered over `reply`.
    GetVersion {
        reply: Option<oneshot::Sender<String>>,
    },
    Unknown,
}

impl ControlMessage {
    /// Decode a JSON message body. Anything that is not an object with a
    /// recognized `type` decodes to [`ControlMessage::Unknown`].
    pub fn decode(body: &[u8], reply: Option<oneshot::Sender<String>>) -> Self {
        match serde_json::from_slice::<MessageRequest>(body) {
            Ok(request) => Self::from_kind(request.kind, reply),
            Err(_) => ControlMessage::Unknown,
        }
    }

    pub fn from_kind(kind: MessageType, reply: Option<oneshot::Sender<String>>) -> Self {
        match kind {
            MessageType::SkipWaiting => ControlMessage::SkipWaiting,
            MessageType::GetVersion => ControlMessage::GetVersion { reply },
            MessageType::Unknown => ControlMessage::Unknown,
        }
    }

    pub fn kind(&self) -> MessageType {
        match self {
            ControlMessage::SkipWaiting => MessageType::SkipWaiting,
            ControlMessage::GetVersion { .. } => MessageType::GetVersion,
            ControlMessage::Unknown => MessageType::Unknown,
        }
    }
}
