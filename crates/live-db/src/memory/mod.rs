//! In-memory repository implementations
//!
//! Same contracts as the PostgreSQL adapters, backed by `parking_lot` locked
//! maps. Data lives as long as the process.

mod message;
mod session;

pub use message::InMemoryMessageRepository;
pub use session::InMemorySessionRepository;
