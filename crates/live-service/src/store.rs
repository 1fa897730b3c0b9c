//! Message store
//!
//! Append-only, per-session ordered message log on top of a
//! [`MessageRepository`]. Each session has its own async mutex guarding its
//! sequence counter; sessions never contend with each other.

use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};

use live_core::{
    ChatMessage, DomainError, MessageRepository, NewChatMessage, Page, SessionState, Snowflake,
    SnowflakeGenerator,
};

use crate::error::ServiceResult;
use crate::registry::SessionRegistry;

/// Last sequence number handed out for a session
///
/// `None` until first loaded from the repository.
#[derive(Debug, Default)]
pub struct SeqCounter {
    last: Option<i64>,
}

/// A freshly appended message, still holding its session's append lock
///
/// Anything done before [`Appended::into_message`] (publishing, typically)
/// is ordered with respect to other appends of the same session.
#[derive(Debug)]
pub struct Appended {
    message: ChatMessage,
    _lock: OwnedMutexGuard<SeqCounter>,
}

impl Appended {
    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    /// Release the append lock
    pub fn into_message(self) -> ChatMessage {
        self.message
    }
}

/// Per-session append-only message log
pub struct MessageStore {
    repo: Arc<dyn MessageRepository>,
    registry: Arc<SessionRegistry>,
    ids: Arc<SnowflakeGenerator>,
    counters: DashMap<Snowflake, Arc<Mutex<SeqCounter>>>,
    page_size: u32,
    max_page_size: u32,
}

impl MessageStore {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        registry: Arc<SessionRegistry>,
        ids: Arc<SnowflakeGenerator>,
        page_size: u32,
        max_page_size: u32,
    ) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            repo,
            registry,
            ids,
            counters: DashMap::new(),
            page_size: page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    /// Take the append lock of a session.
    ///
    /// While held, no message can be appended to the session.
    pub async fn lock_session(&self, session_id: Snowflake) -> OwnedMutexGuard<SeqCounter> {
        let counter = Arc::clone(&self.counters.entry(session_id).or_default());
        counter.lock_owned().await
    }

    /// Append a message to an active session.
    ///
    /// The next sequence number is only consumed once the repository write
    /// succeeded, so a failed append leaves no gap.
    #[instrument(skip(self, body), fields(session_id = %session_id))]
    pub async fn append(
        &self,
        session_id: Snowflake,
        author_id: Option<Snowflake>,
        body: impl Into<String>,
        is_announcement: bool,
    ) -> ServiceResult<Appended> {
        // checked before the counter entry exists, then again under the lock
        if !self.registry.get_state(session_id).await?.is_active() {
            return Err(DomainError::SessionNotActive(session_id).into());
        }

        let mut lock = self.lock_session(session_id).await;

        let state = self.registry.get_state(session_id).await?;
        if !state.is_active() {
            // ended is terminal, so no later append can need this counter
            if state == SessionState::Ended {
                self.forget_session(session_id);
            }
            return Err(DomainError::SessionNotActive(session_id).into());
        }

        let last = match lock.last {
            Some(last) => last,
            None => {
                let last = self.repo.last_seq(session_id).await?;
                lock.last = Some(last);
                last
            }
        };

        let message = NewChatMessage::new(
            self.ids.generate(),
            session_id,
            author_id,
            body,
            is_announcement,
        )
        .with_seq(last + 1);

        if let Err(e) = self.repo.insert(&message).await {
            // the write may have committed anyway; reload the counter next time
            lock.last = None;
            return Err(e.into());
        }
        lock.last = Some(message.seq);

        debug!(seq = message.seq, message_id = %message.id, "Message appended");
        Ok(Appended {
            message,
            _lock: lock,
        })
    }

    /// Messages with `seq > since_seq`, ascending
    pub fn list_since(&self, session_id: Snowflake, since_seq: i64) -> HistoryCursor {
        HistoryCursor {
            repo: Arc::clone(&self.repo),
            session_id,
            since_seq: since_seq.max(0),
            batch_size: i64::from(self.page_size),
        }
    }

    /// One page of the session's history, oldest first.
    ///
    /// `page` is 1-based; `per_page` defaults to the configured page size and
    /// is capped at the configured maximum.
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        session_id: Snowflake,
        page: u32,
        per_page: Option<u32>,
    ) -> ServiceResult<Page<ChatMessage>> {
        let page = page.max(1);
        let per_page = per_page
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let items = self
            .repo
            .find_page(session_id, offset, i64::from(per_page))
            .await?;
        let total = self.repo.count(session_id).await?;

        Ok(Page {
            items,
            page,
            per_page,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    pub async fn last_seq(&self, session_id: Snowflake) -> ServiceResult<i64> {
        Ok(self.repo.last_seq(session_id).await?)
    }

    /// Drop the cached counter of a session that no longer accepts appends
    pub fn forget_session(&self, session_id: Snowflake) {
        self.counters.remove(&session_id);
    }

    pub fn cached_sessions(&self) -> usize {
        self.counters.len()
    }
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("page_size", &self.page_size)
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

/// Lazy, restartable read of a session's log past a given seq
///
/// Nothing is fetched until the cursor is consumed. Each consumption starts
/// again from `since_seq`; clone the cursor to replay it.
#[derive(Clone)]
pub struct HistoryCursor {
    repo: Arc<dyn MessageRepository>,
    session_id: Snowflake,
    since_seq: i64,
    batch_size: i64,
}

struct CursorState {
    cursor: HistoryCursor,
    after: i64,
    buffered: VecDeque<ChatMessage>,
    exhausted: bool,
}

impl CursorState {
    async fn advance(mut self) -> ServiceResult<Option<(ChatMessage, Self)>> {
        if self.buffered.is_empty() && !self.exhausted {
            let batch = self
                .cursor
                .repo
                .find_after(self.cursor.session_id, self.after, self.cursor.batch_size)
                .await?;
            self.exhausted = (batch.len() as i64) < self.cursor.batch_size;
            self.buffered.extend(batch);
        }

        match self.buffered.pop_front() {
            Some(message) => {
                self.after = message.seq;
                Ok(Some((message, self)))
            }
            None => Ok(None),
        }
    }
}

impl HistoryCursor {
    pub fn session_id(&self) -> Snowflake {
        self.session_id
    }

    pub fn since_seq(&self) -> i64 {
        self.since_seq
    }

    /// Stream the messages, fetching one batch at a time.
    ///
    /// Ends after the first error.
    pub fn into_stream(self) -> BoxStream<'static, ServiceResult<ChatMessage>> {
        let state = CursorState {
            after: self.since_seq,
            cursor: self,
            buffered: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(state, CursorState::advance).boxed()
    }

    /// Drain the cursor into memory
    pub async fn collect(&self) -> ServiceResult<Vec<ChatMessage>> {
        let mut messages = Vec::new();
        let mut stream = self.clone().into_stream();
        while let Some(message) = stream.next().await {
            messages.push(message?);
        }
        Ok(messages)
    }
}

impl std::fmt::Debug for HistoryCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCursor")
            .field("session_id", &self.session_id)
            .field("since_seq", &self.since_seq)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}
