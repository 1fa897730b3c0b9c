//! # live-gateway
//!
//! REST API and WebSocket stream for live-session chat, built with Axum.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod protocol;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;
pub mod stream;

pub use server::{create_app, create_app_state, run};
pub use state::AppState;
