//! Test fixtures and data generators

use std::sync::atomic::{AtomicI64, Ordering};

use live_core::{Capabilities, ChatUser, Snowflake};
use serde::{Deserialize, Serialize};

static COUNTER: AtomicI64 = AtomicI64::new(1_000);

/// Fresh id for sessions and users, unique within the test binary
pub fn unique_id() -> Snowflake {
    Snowflake::new(COUNTER.fetch_add(1, Ordering::SeqCst))
}

pub fn host() -> ChatUser {
    ChatUser::host(unique_id())
}

pub fn student() -> ChatUser {
    ChatUser::participant(unique_id())
}

pub fn moderator() -> ChatUser {
    ChatUser::new(unique_id(), Capabilities::MODERATE)
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub is_announcement: bool,
}

impl SendMessageRequest {
    pub fn chat(message: &str) -> Self {
        Self {
            message: message.to_string(),
            is_announcement: false,
        }
    }

    pub fn announcement(message: &str) -> Self {
        Self {
            message: message.to_string(),
            is_announcement: true,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ScheduleSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Snowflake>,
}

/// `{ "success": true, "data": ... }`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

/// `{ "success": false, "code", "message" }`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub id: Snowflake,
    pub host_id: Snowflake,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    pub id: Snowflake,
    pub session_id: Snowflake,
    pub seq: i64,
    pub author_id: Option<Snowflake>,
    pub body: String,
    pub is_announcement: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_next: bool,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<Snowflake>,
}
