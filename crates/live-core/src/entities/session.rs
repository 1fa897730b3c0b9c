//! LiveSession entity - a bounded chat room tied to a class or lecture

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Lifecycle state of a live session
///
/// `Scheduled -> Active -> Ended`; `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Scheduled,
    Active,
    Ended,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    #[inline]
    pub const fn is_ended(self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            other => Err(DomainError::InternalError(format!(
                "unknown session state: {other}"
            ))),
        }
    }
}

/// LiveSession entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSession {
    pub id: Snowflake,
    pub host_id: Snowflake,
    pub state: SessionState,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl LiveSession {
    /// Create a session waiting to be opened
    pub fn scheduled(
        id: Snowflake,
        host_id: Snowflake,
        scheduled_start: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            host_id,
            state: SessionState::Scheduled,
            scheduled_start,
            started_at: None,
            ended_at: None,
        }
    }

    /// Create a session that is already live
    pub fn active(id: Snowflake, host_id: Snowflake) -> Self {
        Self {
            id,
            host_id,
            state: SessionState::Active,
            scheduled_start: None,
            started_at: Some(Utc::now()),
            ended_at: None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    #[inline]
    pub fn is_host(&self, user_id: Snowflake) -> bool {
        self.host_id == user_id
    }

    /// Transition `Scheduled -> Active`
    pub fn start(&mut self) -> Result<(), DomainError> {
        match self.state {
            SessionState::Scheduled => {
                self.state = SessionState::Active;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            SessionState::Active => Err(DomainError::AlreadyOpen(self.id)),
            SessionState::Ended => Err(DomainError::SessionNotActive(self.id)),
        }
    }

    /// Transition `Active -> Ended`.
    ///
    /// Returns `Ok(false)` when the session had already ended.
    pub fn end(&mut self) -> Result<bool, DomainError> {
        match self.state {
            SessionState::Active => {
                self.state = SessionState::Ended;
                self.ended_at = Some(Utc::now());
                Ok(true)
            }
            SessionState::Ended => Ok(false),
            SessionState::Scheduled => Err(DomainError::SessionNotActive(self.id)),
        }
    }
}
