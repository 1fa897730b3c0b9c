//! ChatMessage entity <-> model mapper

use live_core::{ChatMessage, Snowflake};

use crate::models::ChatMessageModel;

impl From<ChatMessageModel> for ChatMessage {
    fn from(model: ChatMessageModel) -> Self {
        ChatMessage {
            id: Snowflake::new(model.id),
            session_id: Snowflake::new(model.session_id),
            seq: model.seq,
            author_id: model.author_id.map(Snowflake::new),
            body: model.body,
            is_announcement: model.is_announcement,
            created_at: model.created_at,
        }
    }
}
