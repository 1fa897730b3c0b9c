//! Stream protocol definitions
//!
//! Frames are JSON text `{op, t, s, d}`; close codes live in the 4000 range.

mod close_codes;
mod messages;
mod opcodes;

pub use close_codes::CloseCode;
pub use messages::{event_names, GatewayMessage, HelloPayload, ReadyPayload};
pub use opcodes::OpCode;
