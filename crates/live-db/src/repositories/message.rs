//! PostgreSQL implementation of MessageRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use live_core::{ChatMessage, DomainError, MessageRepository, RepoResult, Snowflake};

use crate::models::ChatMessageModel;

use super::error::{map_db_error, map_unique_violation};

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(session_id = %message.session_id, seq = message.seq))]
    async fn insert(&self, message: &ChatMessage) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO chat_messages (id, session_id, seq, author_id, body, is_announcement, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(message.id.into_inner())
        .bind(message.session_id.into_inner())
        .bind(message.seq)
        .bind(message.author_id.map(Snowflake::into_inner))
        .bind(&message.body)
        .bind(message.is_announcement)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                DomainError::DatabaseError(format!(
                    "duplicate seq {} in session {}",
                    message.seq, message.session_id
                ))
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn last_seq(&self, session_id: Snowflake) -> RepoResult<i64> {
        let (max,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(seq) FROM chat_messages WHERE session_id = $1")
                .bind(session_id.into_inner())
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(max.unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn find_after(
        &self,
        session_id: Snowflake,
        after_seq: i64,
        limit: i64,
    ) -> RepoResult<Vec<ChatMessage>> {
        let results = sqlx::query_as::<_, ChatMessageModel>(
            r"
            SELECT id, session_id, seq, author_id, body, is_announcement, created_at
            FROM chat_messages
            WHERE session_id = $1 AND seq > $2
            ORDER BY seq ASC
            LIMIT $3
            ",
        )
        .bind(session_id.into_inner())
        .bind(after_seq)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ChatMessage::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_page(
        &self,
        session_id: Snowflake,
        offset: i64,
        limit: i64,
    ) -> RepoResult<Vec<ChatMessage>> {
        let results = sqlx::query_as::<_, ChatMessageModel>(
            r"
            SELECT id, session_id, seq, author_id, body, is_announcement, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY seq ASC
            OFFSET $2
            LIMIT $3
            ",
        )
        .bind(session_id.into_inner())
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ChatMessage::from).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self, session_id: Snowflake) -> RepoResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM chat_messages WHERE session_id = $1")
                .bind(session_id.into_inner())
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(count)
    }
}
