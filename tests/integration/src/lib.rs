//! Integration test utilities for the live gateway
//!
//! Spawns the gateway on an ephemeral port with in-memory storage and
//! drives it over HTTP and WebSocket.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
