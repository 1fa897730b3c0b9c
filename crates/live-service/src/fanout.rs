//! Fan-out dispatcher
//!
//! Every connected participant owns a bounded queue; `publish` pushes into
//! each queue without waiting. A participant whose queue is full or closed
//! is dropped with a warning, and the other participants are unaffected.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use live_core::{ChatMessage, DomainError, SessionEvent, Snowflake};

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<SessionEvent>,
}

#[derive(Default)]
struct HubState {
    /// Highest seq published through this hub
    last_seq: i64,
    subscribers: HashMap<Snowflake, Subscriber>,
}

/// Subscribers of one session
#[derive(Default)]
struct Hub {
    state: Mutex<HubState>,
}

/// A registered delivery target
///
/// Every event published after the subscription was taken is buffered in
/// `receiver`, in publish order.
#[derive(Debug)]
pub struct Subscription {
    pub session_id: Snowflake,
    pub user_id: Snowflake,
    pub subscription_id: u64,
    /// Last seq published to the session when this subscription was taken
    pub last_seq: i64,
    pub receiver: mpsc::Receiver<SessionEvent>,
}

/// In-process fan-out of session events to connected participants
pub struct FanoutDispatcher {
    hubs: DashMap<Snowflake, Arc<Hub>>,
    buffer: usize,
    next_id: AtomicU64,
}

impl FanoutDispatcher {
    /// `buffer` is the capacity of each participant's queue
    pub fn new(buffer: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            buffer: buffer.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a delivery target for `user_id`, replacing any previous one.
    ///
    /// The replaced subscription's queue is closed.
    pub fn subscribe(&self, session_id: Snowflake, user_id: Snowflake) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let subscription_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // the map entry stays locked while registering so end_session cannot
        // remove the hub in between
        let hub = self.hubs.entry(session_id).or_default();
        let mut state = hub.state.lock();
        let replaced = state
            .subscribers
            .insert(user_id, Subscriber { id: subscription_id, sender })
            .is_some();
        let last_seq = state.last_seq;
        drop(state);
        drop(hub);

        debug!(
            session_id = %session_id,
            user_id = %user_id,
            subscription_id,
            last_seq,
            replaced,
            "Subscribed"
        );

        Subscription {
            session_id,
            user_id,
            subscription_id,
            last_seq,
            receiver,
        }
    }

    /// Deliver a freshly appended message to every subscriber of its session.
    ///
    /// Never blocks. Returns the number of queues that accepted the message.
    pub fn publish(&self, message: &ChatMessage) -> usize {
        let Some(hub) = self.hubs.get(&message.session_id).map(|h| Arc::clone(&h)) else {
            return 0;
        };

        let mut state = hub.state.lock();
        state.last_seq = state.last_seq.max(message.seq);

        let mut lost = Vec::new();
        let mut delivered = 0;
        for (user_id, subscriber) in &state.subscribers {
            match subscriber
                .sender
                .try_send(SessionEvent::MessageCreated(message.clone()))
            {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_) | TrySendError::Closed(_)) => lost.push(*user_id),
            }
        }

        let pruned = !lost.is_empty();
        for user_id in lost {
            state.subscribers.remove(&user_id);
            let err = DomainError::ConnectionLost {
                session_id: message.session_id,
                user_id,
            };
            warn!(
                session_id = %message.session_id,
                user_id = %user_id,
                seq = message.seq,
                error = %err,
                "Dropping subscriber"
            );
        }
        drop(state);

        if pruned {
            self.remove_if_empty(message.session_id);
        }
        delivered
    }

    /// Remove the delivery target of `user_id`; no-op if absent
    pub fn unsubscribe(&self, session_id: Snowflake, user_id: Snowflake) {
        let removed = self.hubs.get(&session_id).is_some_and(|hub| {
            hub.state.lock().subscribers.remove(&user_id).is_some()
        });

        if removed {
            debug!(session_id = %session_id, user_id = %user_id, "Unsubscribed");
            self.remove_if_empty(session_id);
        }
    }

    /// Remove `subscription` only if it has not been replaced since
    pub fn detach(&self, subscription_id: u64, session_id: Snowflake, user_id: Snowflake) {
        let removed = self.hubs.get(&session_id).is_some_and(|hub| {
            let mut state = hub.state.lock();
            let current = state
                .subscribers
                .get(&user_id)
                .is_some_and(|s| s.id == subscription_id);
            if current {
                state.subscribers.remove(&user_id);
            }
            current
        });

        if removed {
            debug!(session_id = %session_id, user_id = %user_id, "Detached");
            self.remove_if_empty(session_id);
        }
    }

    /// Drop a hub nobody listens to.
    ///
    /// Must not be called while holding a guard into `hubs`; the check and
    /// the removal run under the map's shard lock, as `subscribe` does.
    fn remove_if_empty(&self, session_id: Snowflake) {
        self.hubs
            .remove_if(&session_id, |_, hub| hub.state.lock().subscribers.is_empty());
    }

    /// Tell every subscriber the session ended, then drop them all
    pub fn end_session(&self, session_id: Snowflake) -> usize {
        let Some((_, hub)) = self.hubs.remove(&session_id) else {
            return 0;
        };

        let subscribers = std::mem::take(&mut hub.state.lock().subscribers);
        let count = subscribers.len();
        for subscriber in subscribers.into_values() {
            // a full queue is closed by dropping the sender below
            let _ = subscriber
                .sender
                .try_send(SessionEvent::SessionEnded { session_id });
        }

        info!(session_id = %session_id, subscribers = count, "Session fan-out ended");
        count
    }

    /// Number of sessions that currently have a hub
    pub fn session_count(&self) -> usize {
        self.hubs.len()
    }

    pub fn subscriber_count(&self, session_id: Snowflake) -> usize {
        self.hubs
            .get(&session_id)
            .map_or(0, |hub| hub.state.lock().subscribers.len())
    }
}

impl Default for FanoutDispatcher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for FanoutDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutDispatcher")
            .field("sessions", &self.hubs.len())
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
