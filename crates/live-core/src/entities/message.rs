//! ChatMessage entity - one entry of a session's append-only log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A persisted chat message
///
/// `seq` is assigned at append time, starts at 1 and is gap-free within a
/// session; it defines the total order clients use to deduplicate and resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Snowflake,
    pub session_id: Snowflake,
    pub seq: i64,
    /// `None` for system-authored announcements
    pub author_id: Option<Snowflake>,
    pub body: String,
    pub is_announcement: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    #[inline]
    pub fn is_system(&self) -> bool {
        self.author_id.is_none()
    }

    /// Truncated preview of the body, cut on a char boundary
    pub fn preview(&self, max_len: usize) -> &str {
        if self.body.len() <= max_len {
            return &self.body;
        }
        let mut end = max_len;
        while end > 0 && !self.body.is_char_boundary(end) {
            end -= 1;
        }
        &self.body[..end]
    }
}

/// A message ready to be written; the store fills in `seq`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub id: Snowflake,
    pub session_id: Snowflake,
    pub author_id: Option<Snowflake>,
    pub body: String,
    pub is_announcement: bool,
    pub created_at: DateTime<Utc>,
}

impl NewChatMessage {
    pub fn new(
        id: Snowflake,
        session_id: Snowflake,
        author_id: Option<Snowflake>,
        body: impl Into<String>,
        is_announcement: bool,
    ) -> Self {
        Self {
            id,
            session_id,
            author_id,
            body: body.into(),
            is_announcement,
            created_at: Utc::now(),
        }
    }

    /// Materialize with the sequence number assigned by the store
    pub fn with_seq(self, seq: i64) -> ChatMessage {
        ChatMessage {
            id: self.id,
            session_id: self.session_id,
            seq,
            author_id: self.author_id,
            body: self.body,
            is_announcement: self.is_announcement,
            created_at: self.created_at,
        }
    }
}
