//! Domain entities - core business objects

mod message;
mod page;
mod session;
mod user;

pub use message::{ChatMessage, NewChatMessage};
pub use page::Page;
pub use session::{LiveSession, SessionState};
pub use user::ChatUser;
