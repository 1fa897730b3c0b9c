//! # live-service
//!
//! The live-session chat core.
//!
//! - [`registry::SessionRegistry`]: session lifecycle and joined participants
//! - [`store::MessageStore`]: per-session append-only log with gap-free seqs
//! - [`fanout::FanoutDispatcher`]: bounded per-connection delivery queues
//! - [`chat::ChatService`]: the boundary tying them together

pub mod chat;
pub mod error;
pub mod fanout;
pub mod registry;
pub mod store;

pub use chat::{ChatService, LiveStream, StreamEvent};
pub use error::{ServiceError, ServiceResult};
pub use fanout::{FanoutDispatcher, Subscription};
pub use registry::{ParticipantHandle, SessionRegistry};
pub use store::{Appended, HistoryCursor, MessageStore};
