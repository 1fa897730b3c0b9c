//! # live-core
//!
//! Domain layer for live-session chat: sessions, messages, identities,
//! the error taxonomy and the repository ports implemented by `live-db`.
//! This crate has zero dependencies on infrastructure.

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{ChatMessage, ChatUser, LiveSession, NewChatMessage, Page, SessionState};
pub use error::DomainError;
pub use events::SessionEvent;
pub use traits::{MessageRepository, RepoResult, SessionRepository};
pub use value_objects::{Capabilities, Snowflake, SnowflakeGenerator, SnowflakeParseError};
