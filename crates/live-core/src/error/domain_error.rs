//! Domain errors - the chat error taxonomy

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    // =========================================================================
    // Session lifecycle
    // =========================================================================
    #[error("Live session not found: {0}")]
    SessionNotFound(Snowflake),

    #[error("Live session is not active: {0}")]
    SessionNotActive(Snowflake),

    #[error("Live session is already open: {0}")]
    AlreadyOpen(Snowflake),

    // =========================================================================
    // Authorization
    // =========================================================================
    #[error("User {user_id} has not joined session {session_id}")]
    NotParticipant {
        session_id: Snowflake,
        user_id: Snowflake,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // =========================================================================
    // Validation
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Message too long: max {max} characters")]
    BodyTooLong { max: usize },

    // =========================================================================
    // Delivery (non-fatal, never surfaced to a sender)
    // =========================================================================
    #[error("Connection lost: user {user_id} in session {session_id}")]
    ConnectionLost {
        session_id: Snowflake,
        user_id: Snowflake,
    },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "UNKNOWN_SESSION",
            Self::SessionNotActive(_) => "SESSION_NOT_ACTIVE",
            Self::AlreadyOpen(_) => "SESSION_ALREADY_OPEN",
            Self::NotParticipant { .. } => "NOT_PARTICIPANT",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BodyTooLong { .. } => "MESSAGE_TOO_LONG",
            Self::ConnectionLost { .. } => "CONNECTION_LOST",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::BodyTooLong { .. })
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::NotParticipant { .. } | Self::Forbidden(_))
    }

    /// Lifecycle conflicts: the request is well-formed but the session is in
    /// the wrong state for it
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::SessionNotActive(_) | Self::AlreadyOpen(_))
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }
}
