//! Model <-> entity conversions

mod message;
mod session;
