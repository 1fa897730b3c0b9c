use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::instrument;

use live_core::{DomainError, LiveSession, RepoResult, SessionRepository, Snowflake};

/// Process-local session table
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<Snowflake, LiveSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<LiveSession>> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn create(&self, session: &LiveSession) -> RepoResult<()> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.id) {
            return Err(DomainError::AlreadyOpen(session.id));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    #[instrument(skip(self, session), fields(session_id = %session.id, state = %session.state))]
    async fn update(&self, session: &LiveSession) -> RepoResult<()> {
        match self.sessions.write().get_mut(&session.id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(DomainError::SessionNotFound(session.id)),
        }
    }
}
