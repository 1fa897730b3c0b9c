//! PostgreSQL implementation of SessionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use live_core::{DomainError, LiveSession, RepoResult, SessionRepository, Snowflake};

use crate::models::LiveSessionModel;

use super::error::{map_db_error, map_unique_violation};

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<LiveSession>> {
        let result = sqlx::query_as::<_, LiveSessionModel>(
            r"
            SELECT id, host_id, state, scheduled_start, started_at, ended_at
            FROM live_sessions
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(LiveSession::try_from).transpose()
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn create(&self, session: &LiveSession) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO live_sessions (id, host_id, state, scheduled_start, started_at, ended_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(session.id.into_inner())
        .bind(session.host_id.into_inner())
        .bind(session.state.as_str())
        .bind(session.scheduled_start)
        .bind(session.started_at)
        .bind(session.ended_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::AlreadyOpen(session.id)))?;

        Ok(())
    }

    #[instrument(skip(self, session), fields(session_id = %session.id, state = %session.state))]
    async fn update(&self, session: &LiveSession) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE live_sessions
            SET state = $2, started_at = $3, ended_at = $4
            WHERE id = $1
            ",
        )
        .bind(session.id.into_inner())
        .bind(session.state.as_str())
        .bind(session.started_at)
        .bind(session.ended_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SessionNotFound(session.id));
        }

        Ok(())
    }
}
