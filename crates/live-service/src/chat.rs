//! Chat gateway
//!
//! Boundary of the chat core: checks who may do what, then drives the
//! registry, the store and the fan-out dispatcher.

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, info, instrument};

use live_common::ChatConfig;
use live_core::{
    ChatMessage, ChatUser, DomainError, LiveSession, MessageRepository, Page, SessionEvent,
    SessionRepository, Snowflake, SnowflakeGenerator,
};
use live_db::{InMemoryMessageRepository, InMemorySessionRepository};

use crate::error::{ServiceError, ServiceResult};
use crate::fanout::{FanoutDispatcher, Subscription};
use crate::registry::{ParticipantHandle, SessionRegistry};
use crate::store::MessageStore;

/// Item of a participant's live stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A message, from history replay or live
    Message(ChatMessage),
    /// History replay finished; everything after this is live
    Ready { last_seq: i64 },
    /// The session was closed; the stream ends after this
    Ended,
}

/// The chat core, wired together
pub struct ChatService {
    registry: Arc<SessionRegistry>,
    store: Arc<MessageStore>,
    fanout: Arc<FanoutDispatcher>,
    ids: Arc<SnowflakeGenerator>,
    max_body_length: usize,
}

impl ChatService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        messages: Arc<dyn MessageRepository>,
        ids: Arc<SnowflakeGenerator>,
        config: &ChatConfig,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(sessions));
        let store = Arc::new(MessageStore::new(
            messages,
            Arc::clone(&registry),
            Arc::clone(&ids),
            config.history_page_size,
            config.max_page_size,
        ));
        let fanout = Arc::new(FanoutDispatcher::new(config.connection_buffer));

        Self {
            registry,
            store,
            fanout,
            ids,
            max_body_length: config.max_body_length,
        }
    }

    /// Service backed by process-local storage
    pub fn in_memory(ids: Arc<SnowflakeGenerator>, config: &ChatConfig) -> Self {
        Self::new(
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(InMemoryMessageRepository::new()),
            ids,
            config,
        )
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn fanout(&self) -> &FanoutDispatcher {
        &self.fanout
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Register a future session hosted by `user`
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn schedule_session(
        &self,
        user: &ChatUser,
        session_id: Option<Snowflake>,
        scheduled_start: Option<DateTime<Utc>>,
    ) -> ServiceResult<LiveSession> {
        if !user.capabilities.can_host() {
            return Err(DomainError::forbidden("host capability required to schedule").into());
        }
        let session_id = session_id.unwrap_or_else(|| self.ids.generate());
        self.registry
            .schedule(session_id, user.id, scheduled_start)
            .await
    }

    /// Start a session; an unknown id creates one hosted by `user`
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn open_session(
        &self,
        user: &ChatUser,
        session_id: Snowflake,
    ) -> ServiceResult<LiveSession> {
        if !user.capabilities.can_host() {
            return Err(DomainError::forbidden("host capability required to open").into());
        }
        self.registry.open(session_id, user.id).await
    }

    /// End a session: no more appends, every live stream receives `Ended`.
    ///
    /// Only the session's host or a moderator may close it.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn close_session(
        &self,
        user: &ChatUser,
        session_id: Snowflake,
    ) -> ServiceResult<LiveSession> {
        let session = self.registry.get(session_id).await?;
        if !session.is_host(user.id) && !user.capabilities.can_announce() {
            return Err(DomainError::forbidden("only the host or a moderator may close").into());
        }

        // appends in flight finish before the state flips
        let lock = self.store.lock_session(session_id).await;
        let closed = self.registry.close(session_id).await?;
        drop(lock);

        if closed {
            self.store.forget_session(session_id);
            self.fanout.end_session(session_id);
        }
        self.registry.get(session_id).await
    }

    pub async fn session(&self, session_id: Snowflake) -> ServiceResult<LiveSession> {
        self.registry.get(session_id).await
    }

    pub async fn participants(&self, session_id: Snowflake) -> ServiceResult<Vec<Snowflake>> {
        self.registry.participants(session_id).await
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Join a session and open its stream: history after `resume_from`
    /// (or from the start), a `Ready` marker, then live events.
    ///
    /// Fails before anything is streamed if the session is not active.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn connect(
        &self,
        session_id: Snowflake,
        user: &ChatUser,
        resume_from: Option<i64>,
    ) -> ServiceResult<LiveStream> {
        if !self.registry.get_state(session_id).await?.is_active() {
            return Err(DomainError::SessionNotActive(session_id).into());
        }

        let handle = self.registry.join(session_id, user.id).await?;
        let subscription = self.fanout.subscribe(session_id, user.id);

        // a close racing with the subscribe either saw the subscriber or is
        // visible here
        if !self.registry.get_state(session_id).await?.is_active() {
            self.fanout
                .detach(subscription.subscription_id, session_id, user.id);
            self.registry.release(&handle);
            return Err(DomainError::SessionNotActive(session_id).into());
        }

        let resume_from = match self.resume_point(session_id, resume_from).await {
            Ok(seq) => seq,
            Err(e) => {
                self.fanout
                    .detach(subscription.subscription_id, session_id, user.id);
                self.registry.release(&handle);
                return Err(e);
            }
        };
        let history = self.store.list_since(session_id, resume_from).into_stream();

        info!(
            session_id = %session_id,
            resume_from,
            live_from = subscription.last_seq,
            "Participant connected"
        );

        Ok(LiveStream {
            history: Some(history),
            subscription,
            handle,
            last_seq: resume_from,
            ready_sent: false,
            done: false,
            registry: Arc::clone(&self.registry),
            fanout: Arc::clone(&self.fanout),
        })
    }

    /// Where replay starts: after `requested`, but never past the end of the
    /// log, so a client ahead of the server still receives every new message.
    ///
    /// Read after subscribing; anything appended later arrives live.
    async fn resume_point(
        &self,
        session_id: Snowflake,
        requested: Option<i64>,
    ) -> ServiceResult<i64> {
        let requested = requested.unwrap_or(0).max(0);
        if requested == 0 {
            return Ok(0);
        }

        let last = self.store.last_seq(session_id).await?;
        if requested > last {
            debug!(
                session_id = %session_id,
                requested,
                last_seq = last,
                "Resume point past end of log"
            );
        }
        Ok(requested.min(last))
    }

    /// Post a message as `user`.
    ///
    /// All checks run before anything is written. The append and the publish
    /// run in their own task, so dropping this future never leaves a message
    /// stored but undelivered.
    #[instrument(skip(self, user, body), fields(user_id = %user.id))]
    pub async fn send(
        &self,
        session_id: Snowflake,
        user: &ChatUser,
        body: &str,
        is_announcement: bool,
    ) -> ServiceResult<ChatMessage> {
        let body = self.validate_body(body)?;

        let session = self.registry.get(session_id).await?;
        if !session.is_active() {
            return Err(DomainError::SessionNotActive(session_id).into());
        }

        let is_host = session.is_host(user.id);
        if !is_host && !self.registry.is_participant(session_id, user.id) {
            return Err(DomainError::NotParticipant {
                session_id,
                user_id: user.id,
            }
            .into());
        }

        if is_announcement && !is_host && !user.capabilities.can_announce() {
            return Err(DomainError::forbidden("announcements require host capability").into());
        }

        self.append_and_publish(session_id, Some(user.id), body, is_announcement)
            .await
    }

    /// Post a system announcement (no author) on behalf of `user`
    #[instrument(skip(self, user, body), fields(user_id = %user.id))]
    pub async fn announce(
        &self,
        session_id: Snowflake,
        user: &ChatUser,
        body: &str,
    ) -> ServiceResult<ChatMessage> {
        let body = self.validate_body(body)?;

        let session = self.registry.get(session_id).await?;
        if !session.is_host(user.id) && !user.capabilities.can_announce() {
            return Err(DomainError::forbidden("announcements require host capability").into());
        }
        if !session.is_active() {
            return Err(DomainError::SessionNotActive(session_id).into());
        }

        self.append_and_publish(session_id, None, body, true).await
    }

    /// Leave the session and stop deliveries to `user`
    #[instrument(skip(self))]
    pub fn disconnect(&self, session_id: Snowflake, user_id: Snowflake) {
        self.registry.leave(session_id, user_id);
        self.fanout.unsubscribe(session_id, user_id);
    }

    /// Paged history, oldest first
    pub async fn history(
        &self,
        session_id: Snowflake,
        page: u32,
        per_page: Option<u32>,
    ) -> ServiceResult<Page<ChatMessage>> {
        // unknown sessions are an error, not an empty page
        self.registry.get(session_id).await?;
        self.store.list_all(session_id, page, per_page).await
    }

    fn validate_body(&self, body: &str) -> ServiceResult<String> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DomainError::ValidationError("message must not be empty".into()).into());
        }
        if body.chars().count() > self.max_body_length {
            return Err(DomainError::BodyTooLong {
                max: self.max_body_length,
            }
            .into());
        }
        Ok(body.to_string())
    }

    async fn append_and_publish(
        &self,
        session_id: Snowflake,
        author_id: Option<Snowflake>,
        body: String,
        is_announcement: bool,
    ) -> ServiceResult<ChatMessage> {
        let store = Arc::clone(&self.store);
        let fanout = Arc::clone(&self.fanout);

        let task = tokio::spawn(async move {
            let appended = store
                .append(session_id, author_id, body, is_announcement)
                .await?;
            // still under the append lock: queues see append order
            let delivered = fanout.publish(appended.message());
            let message = appended.into_message();

            info!(
                session_id = %session_id,
                seq = message.seq,
                is_announcement,
                delivered,
                "Message sent"
            );
            Ok::<_, ServiceError>(message)
        });

        task.await
            .map_err(|e| ServiceError::internal(format!("send task failed: {e}")))?
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("registry", &self.registry)
            .field("store", &self.store)
            .field("fanout", &self.fanout)
            .finish_non_exhaustive()
    }
}

/// A participant's ordered view of a session
///
/// Yields the replayed history, then [`StreamEvent::Ready`], then live
/// messages. A message is never yielded twice and never skipped: anything
/// published while history was replaying is buffered and deduplicated by
/// seq. Dropping the stream leaves the session.
pub struct LiveStream {
    history: Option<BoxStream<'static, ServiceResult<ChatMessage>>>,
    subscription: Subscription,
    handle: ParticipantHandle,
    /// Highest seq yielded so far
    last_seq: i64,
    ready_sent: bool,
    done: bool,
    registry: Arc<SessionRegistry>,
    fanout: Arc<FanoutDispatcher>,
}

impl LiveStream {
    pub fn session_id(&self) -> Snowflake {
        self.handle.session_id
    }

    pub fn user_id(&self) -> Snowflake {
        self.handle.user_id
    }

    pub fn last_seq(&self) -> i64 {
        self.last_seq
    }

    /// Accept a message only if it advances the stream
    fn advance(&mut self, message: ChatMessage) -> Option<StreamEvent> {
        if message.seq <= self.last_seq {
            return None;
        }
        self.last_seq = message.seq;
        Some(StreamEvent::Message(message))
    }
}

impl Stream for LiveStream {
    type Item = ServiceResult<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        while let Some(history) = this.history.as_mut() {
            match history.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(message))) => {
                    if let Some(event) = this.advance(message) {
                        return Poll::Ready(Some(Ok(event)));
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.history = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if !this.ready_sent {
            this.ready_sent = true;
            return Poll::Ready(Some(Ok(StreamEvent::Ready {
                last_seq: this.last_seq,
            })));
        }

        loop {
            match this.subscription.receiver.poll_recv(cx) {
                Poll::Ready(Some(SessionEvent::MessageCreated(message))) => {
                    if let Some(event) = this.advance(message) {
                        return Poll::Ready(Some(Ok(event)));
                    }
                }
                Poll::Ready(Some(SessionEvent::SessionEnded { .. })) => {
                    this.done = true;
                    return Poll::Ready(Some(Ok(StreamEvent::Ended)));
                }
                // dropped by the dispatcher (too slow or replaced)
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.fanout.detach(
            self.subscription.subscription_id,
            self.handle.session_id,
            self.handle.user_id,
        );
        self.registry.release(&self.handle);
    }
}

impl std::fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStream")
            .field("session_id", &self.handle.session_id)
            .field("user_id", &self.handle.user_id)
            .field("last_seq", &self.last_seq)
            .field("replaying", &self.history.is_some())
            .finish_non_exhaustive()
    }
}
