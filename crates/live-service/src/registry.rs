//! Session registry
//!
//! Tracks each live session's lifecycle and the set of users currently
//! joined to it. Sessions are cached in memory and every lifecycle change is
//! written through to the [`SessionRepository`] before it becomes visible.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use live_core::{DomainError, LiveSession, SessionRepository, SessionState, Snowflake};

use crate::error::ServiceResult;

/// Proof that a user joined a session
///
/// Each join gets a fresh `connection_id`, so a stale connection cannot
/// remove a newer one of the same user (see [`SessionRegistry::release`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantHandle {
    pub session_id: Snowflake,
    pub user_id: Snowflake,
    pub connection_id: u64,
    pub joined_at: DateTime<Utc>,
}

struct SessionSlot {
    session: RwLock<LiveSession>,
    /// Serializes lifecycle transitions, held across the repository write
    lifecycle: tokio::sync::Mutex<()>,
    /// user id -> connection id of the latest join
    participants: Mutex<HashMap<Snowflake, u64>>,
}

impl SessionSlot {
    fn new(session: LiveSession) -> Self {
        Self {
            session: RwLock::new(session),
            lifecycle: tokio::sync::Mutex::new(()),
            participants: Mutex::new(HashMap::new()),
        }
    }

    fn snapshot(&self) -> LiveSession {
        self.session.read().clone()
    }
}

/// Registry of live sessions and their joined participants
pub struct SessionRegistry {
    repo: Arc<dyn SessionRepository>,
    slots: DashMap<Snowflake, Arc<SessionSlot>>,
    next_connection: AtomicU64,
}

impl SessionRegistry {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            repo,
            slots: DashMap::new(),
            next_connection: AtomicU64::new(1),
        }
    }

    /// Cached slot, loading from the repository on a miss
    async fn slot(&self, session_id: Snowflake) -> ServiceResult<Option<Arc<SessionSlot>>> {
        if let Some(slot) = self.slots.get(&session_id) {
            return Ok(Some(Arc::clone(&slot)));
        }

        let Some(session) = self.repo.find_by_id(session_id).await? else {
            return Ok(None);
        };

        let slot = self
            .slots
            .entry(session_id)
            .or_insert_with(|| Arc::new(SessionSlot::new(session)));
        Ok(Some(Arc::clone(&slot)))
    }

    async fn require(&self, session_id: Snowflake) -> ServiceResult<Arc<SessionSlot>> {
        self.slot(session_id)
            .await?
            .ok_or_else(|| DomainError::SessionNotFound(session_id).into())
    }

    fn cache(&self, session: LiveSession) {
        self.slots
            .entry(session.id)
            .or_insert_with(|| Arc::new(SessionSlot::new(session)));
    }

    /// Register a session that will be opened later
    #[instrument(skip(self))]
    pub async fn schedule(
        &self,
        session_id: Snowflake,
        host_id: Snowflake,
        scheduled_start: Option<DateTime<Utc>>,
    ) -> ServiceResult<LiveSession> {
        if self.slot(session_id).await?.is_some() {
            return Err(DomainError::AlreadyOpen(session_id).into());
        }

        let session = LiveSession::scheduled(session_id, host_id, scheduled_start);
        self.repo.create(&session).await?;
        self.cache(session.clone());

        info!(session_id = %session_id, host_id = %host_id, "Session scheduled");
        Ok(session)
    }

    /// Move a scheduled session to `active`, or create it already active.
    ///
    /// `host_id` only applies when the session is unknown; a scheduled
    /// session keeps the host it was scheduled with.
    #[instrument(skip(self))]
    pub async fn open(&self, session_id: Snowflake, host_id: Snowflake) -> ServiceResult<LiveSession> {
        let Some(slot) = self.slot(session_id).await? else {
            let session = LiveSession::active(session_id, host_id);
            self.repo.create(&session).await?;
            self.cache(session.clone());

            info!(session_id = %session_id, host_id = %host_id, "Session opened");
            return Ok(session);
        };

        let _lifecycle = slot.lifecycle.lock().await;
        let mut next = slot.snapshot();
        next.start()?;
        self.repo.update(&next).await?;
        *slot.session.write() = next.clone();

        info!(session_id = %session_id, host_id = %next.host_id, "Session opened");
        Ok(next)
    }

    /// Move an active session to `ended` and drop all participants.
    ///
    /// Returns `false` when the session had already ended.
    #[instrument(skip(self))]
    pub async fn close(&self, session_id: Snowflake) -> ServiceResult<bool> {
        let slot = self.require(session_id).await?;

        let _lifecycle = slot.lifecycle.lock().await;
        let mut next = slot.snapshot();
        if !next.end()? {
            return Ok(false);
        }
        self.repo.update(&next).await?;
        *slot.session.write() = next;

        let dropped = {
            let mut participants = slot.participants.lock();
            let count = participants.len();
            participants.clear();
            count
        };

        info!(session_id = %session_id, participants = dropped, "Session closed");
        Ok(true)
    }

    pub async fn get(&self, session_id: Snowflake) -> ServiceResult<LiveSession> {
        Ok(self.require(session_id).await?.snapshot())
    }

    pub async fn get_state(&self, session_id: Snowflake) -> ServiceResult<SessionState> {
        Ok(self.require(session_id).await?.session.read().state)
    }

    /// Register `user_id` as a participant; the session must be active
    #[instrument(skip(self))]
    pub async fn join(
        &self,
        session_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<ParticipantHandle> {
        let slot = self.require(session_id).await?;

        // state is checked under the participant lock so a concurrent close
        // either rejects this join or clears it
        let mut participants = slot.participants.lock();
        if !slot.session.read().is_active() {
            return Err(DomainError::SessionNotActive(session_id).into());
        }

        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        participants.insert(user_id, connection_id);
        drop(participants);

        debug!(session_id = %session_id, user_id = %user_id, connection_id, "Participant joined");
        Ok(ParticipantHandle {
            session_id,
            user_id,
            connection_id,
            joined_at: Utc::now(),
        })
    }

    /// Remove a participant; no-op if absent
    pub fn leave(&self, session_id: Snowflake, user_id: Snowflake) {
        if let Some(slot) = self.slots.get(&session_id) {
            if slot.participants.lock().remove(&user_id).is_some() {
                debug!(session_id = %session_id, user_id = %user_id, "Participant left");
            }
        }
    }

    /// Remove the participant only if `handle` is still its latest join
    pub fn release(&self, handle: &ParticipantHandle) {
        if let Some(slot) = self.slots.get(&handle.session_id) {
            let mut participants = slot.participants.lock();
            if participants.get(&handle.user_id) == Some(&handle.connection_id) {
                participants.remove(&handle.user_id);
                debug!(
                    session_id = %handle.session_id,
                    user_id = %handle.user_id,
                    "Participant released"
                );
            }
        }
    }

    pub fn is_participant(&self, session_id: Snowflake, user_id: Snowflake) -> bool {
        self.slots
            .get(&session_id)
            .is_some_and(|slot| slot.participants.lock().contains_key(&user_id))
    }

    /// Currently joined users, sorted by id
    pub async fn participants(&self, session_id: Snowflake) -> ServiceResult<Vec<Snowflake>> {
        let slot = self.require(session_id).await?;
        let mut users: Vec<Snowflake> = slot.participants.lock().keys().copied().collect();
        users.sort_unstable();
        Ok(users)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("cached_sessions", &self.slots.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_db::InMemorySessionRepository;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(InMemorySessionRepository::new()))
    }

    const S1: Snowflake = Snowflake::new(100);
    const HOST: Snowflake = Snowflake::new(1);
    const USER: Snowflake = Snowflake::new(2);

    #[tokio::test]
    async fn test_open_unknown_creates_active() {
        let registry = registry();
        let session = registry.open(S1, HOST).await.unwrap();

        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.host_id, HOST);
        assert_eq!(registry.get_state(S1).await.unwrap(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_open_twice_is_already_open() {
        let registry = registry();
        registry.open(S1, HOST).await.unwrap();

        let err = registry.open(S1, HOST).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::AlreadyOpen(_))));
    }

    #[tokio::test]
    async fn test_scheduled_then_open_keeps_host() {
        let registry = registry();
        registry.schedule(S1, HOST, None).await.unwrap();
        assert_eq!(registry.get_state(S1).await.unwrap(), SessionState::Scheduled);

        let session = registry.open(S1, USER).await.unwrap();
        assert_eq!(session.host_id, HOST);
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_terminal() {
        let registry = registry();
        registry.open(S1, HOST).await.unwrap();

        assert!(registry.close(S1).await.unwrap());
        assert!(!registry.close(S1).await.unwrap());
        assert_eq!(registry.get_state(S1).await.unwrap(), SessionState::Ended);

        let err = registry.open(S1, HOST).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::SessionNotActive(_))));
    }

    #[tokio::test]
    async fn test_unknown_session_not_found() {
        let registry = registry();
        for err in [
            registry.close(S1).await.unwrap_err(),
            registry.get_state(S1).await.unwrap_err(),
            registry.join(S1, USER).await.unwrap_err(),
        ] {
            assert!(matches!(err.domain(), Some(DomainError::SessionNotFound(_))));
        }
    }

    #[tokio::test]
    async fn test_join_requires_active() {
        let registry = registry();
        registry.schedule(S1, HOST, None).await.unwrap();

        let err = registry.join(S1, USER).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::SessionNotActive(_))));
        assert!(!registry.is_participant(S1, USER));
    }

    #[tokio::test]
    async fn test_join_leave_and_close_drops_participants() {
        let registry = registry();
        registry.open(S1, HOST).await.unwrap();

        registry.join(S1, USER).await.unwrap();
        registry.join(S1, HOST).await.unwrap();
        assert_eq!(registry.participants(S1).await.unwrap(), vec![HOST, USER]);

        registry.leave(S1, USER);
        registry.leave(S1, USER);
        assert!(!registry.is_participant(S1, USER));

        registry.close(S1).await.unwrap();
        assert!(registry.participants(S1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_release_keeps_newer_join() {
        let registry = registry();
        registry.open(S1, HOST).await.unwrap();

        let first = registry.join(S1, USER).await.unwrap();
        let second = registry.join(S1, USER).await.unwrap();
        assert_ne!(first.connection_id, second.connection_id);

        registry.release(&first);
        assert!(registry.is_participant(S1, USER));

        registry.release(&second);
        assert!(!registry.is_participant(S1, USER));
    }

    #[tokio::test]
    async fn test_loads_sessions_from_repository() {
        let repo = Arc::new(InMemorySessionRepository::new());
        repo.create(&LiveSession::active(S1, HOST)).await.unwrap();

        let registry = SessionRegistry::new(repo);
        assert_eq!(registry.get(S1).await.unwrap().host_id, HOST);
    }
}
