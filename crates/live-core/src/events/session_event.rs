//! Events pushed to the participants of a live session

use serde::{Deserialize, Serialize};

use crate::entities::ChatMessage;
use crate::value_objects::Snowflake;

/// An event delivered on a participant's live stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    /// A message was appended to the session log
    MessageCreated(ChatMessage),
    /// The session was closed; no further events follow
    SessionEnded { session_id: Snowflake },
}

impl SessionEvent {
    /// Event name used on the wire
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => "MESSAGE_CREATE",
            Self::SessionEnded { .. } => "SESSION_ENDED",
        }
    }

    pub fn session_id(&self) -> Snowflake {
        match self {
            Self::MessageCreated(m) => m.session_id,
            Self::SessionEnded { session_id } => *session_id,
        }
    }

    /// Sequence number for message events
    pub fn seq(&self) -> Option<i64> {
        match self {
            Self::MessageCreated(m) => Some(m.seq),
            Self::SessionEnded { .. } => None,
        }
    }
}
