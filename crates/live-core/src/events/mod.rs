//! Domain events delivered to live session participants

mod session_event;

pub use session_event::SessionEvent;
