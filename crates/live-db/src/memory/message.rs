use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

use live_core::{ChatMessage, DomainError, MessageRepository, RepoResult, Snowflake};

/// Process-local message logs, one ordered map per session keyed by seq
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    logs: RwLock<HashMap<Snowflake, BTreeMap<i64, ChatMessage>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message), fields(session_id = %message.session_id, seq = message.seq))]
    async fn insert(&self, message: &ChatMessage) -> RepoResult<()> {
        let mut logs = self.logs.write();
        let log = logs.entry(message.session_id).or_default();
        if log.contains_key(&message.seq) {
            return Err(DomainError::DatabaseError(format!(
                "duplicate seq {} in session {}",
                message.seq, message.session_id
            )));
        }
        log.insert(message.seq, message.clone());
        Ok(())
    }

    async fn last_seq(&self, session_id: Snowflake) -> RepoResult<i64> {
        Ok(self
            .logs
            .read()
            .get(&session_id)
            .and_then(|log| log.keys().next_back().copied())
            .unwrap_or(0))
    }

    async fn find_after(
        &self,
        session_id: Snowflake,
        after_seq: i64,
        limit: i64,
    ) -> RepoResult<Vec<ChatMessage>> {
        let logs = self.logs.read();
        let Some(log) = logs.get(&session_id) else {
            return Ok(Vec::new());
        };
        Ok(log
            .range(after_seq.saturating_add(1)..)
            .take(to_usize(limit))
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn find_page(
        &self,
        session_id: Snowflake,
        offset: i64,
        limit: i64,
    ) -> RepoResult<Vec<ChatMessage>> {
        let logs = self.logs.read();
        let Some(log) = logs.get(&session_id) else {
            return Ok(Vec::new());
        };
        Ok(log
            .values()
            .skip(to_usize(offset))
            .take(to_usize(limit))
            .cloned()
            .collect())
    }

    async fn count(&self, session_id: Snowflake) -> RepoResult<i64> {
        Ok(self
            .logs
            .read()
            .get(&session_id)
            .map_or(0, |log| log.len() as i64))
    }
}
