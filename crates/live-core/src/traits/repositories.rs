//! Repository traits (ports) - the storage interface the chat core needs
//!
//! `live-db` provides PostgreSQL and in-memory implementations.

use async_trait::async_trait;

use crate::entities::{ChatMessage, LiveSession};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Session Repository
// ============================================================================

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find a session by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<LiveSession>>;

    /// Insert a new session; fails with `AlreadyOpen` if the id is taken
    async fn create(&self, session: &LiveSession) -> RepoResult<()>;

    /// Persist lifecycle fields (state and timestamps)
    async fn update(&self, session: &LiveSession) -> RepoResult<()>;
}

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a message whose `seq` has already been assigned.
    ///
    /// Must reject a duplicate `(session_id, seq)`.
    async fn insert(&self, message: &ChatMessage) -> RepoResult<()>;

    /// Highest sequence number stored for a session (0 when empty)
    async fn last_seq(&self, session_id: Snowflake) -> RepoResult<i64>;

    /// Messages with `seq > after_seq`, ascending, at most `limit`
    async fn find_after(
        &self,
        session_id: Snowflake,
        after_seq: i64,
        limit: i64,
    ) -> RepoResult<Vec<ChatMessage>>;

    /// Messages ordered by `seq` ascending, skipping `offset`
    async fn find_page(
        &self,
        session_id: Snowflake,
        offset: i64,
        limit: i64,
    ) -> RepoResult<Vec<ChatMessage>>;

    /// Number of messages stored for a session
    async fn count(&self, session_id: Snowflake) -> RepoResult<i64>;
}
