//! Chat message database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the chat_messages table
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageModel {
    pub id: i64,
    pub session_id: i64,
    pub seq: i64,
    pub author_id: Option<i64>,
    pub body: String,
    pub is_announcement: bool,
    pub created_at: DateTime<Utc>,
}
