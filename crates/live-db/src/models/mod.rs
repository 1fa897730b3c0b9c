//! Database models (row shapes)

mod message;
mod session;

pub use message::ChatMessageModel;
pub use session::LiveSessionModel;
