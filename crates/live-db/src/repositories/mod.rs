//! PostgreSQL implementations of the repository traits defined in live-core

mod error;
mod message;
mod session;

pub use message::PgMessageRepository;
pub use session::PgSessionRepository;
