//! Route definitions
//!
//! Session routes live under `/api/v1`; `/health` sits outside it.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, messages, sessions};
use crate::state::AppState;
use crate::stream::stream_handler;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(health_routes())
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Lifecycle
        .route("/sessions", post(sessions::schedule_session))
        .route("/sessions/:session_id", get(sessions::get_session))
        .route("/sessions/:session_id/open", post(sessions::open_session))
        .route("/sessions/:session_id/close", post(sessions::close_session))
        .route(
            "/sessions/:session_id/participants",
            get(sessions::get_participants),
        )
        // Messages
        .route(
            "/sessions/:session_id/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/sessions/:session_id/announcements",
            post(messages::post_announcement),
        )
        // Live stream
        .route("/sessions/:session_id/stream", get(stream_handler))
}
