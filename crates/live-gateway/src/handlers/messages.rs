//! Message handlers
//!
//! Posting over REST goes through the same checks and fan-out as the
//! stream; the sender must have joined via the stream (or host the session).

use axum::extract::State;
use live_core::{ChatMessage, Page};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extractors::{AuthUser, Pagination, SessionIdPath, ValidatedJson};
use crate::response::{ApiResponse, ApiResult, Created};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Trimmed and length-checked by the chat core
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
    #[serde(default)]
    pub is_announcement: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnnounceRequest {
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
}

impl From<Page<ChatMessage>> for HistoryResponse {
    fn from(page: Page<ChatMessage>) -> Self {
        Self {
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            messages: page.items,
        }
    }
}

/// POST /api/v1/sessions/:session_id/messages
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> ApiResult<Created<ApiResponse<ChatMessage>>> {
    let message = state
        .chat()
        .send(session_id, &user, &request.message, request.is_announcement)
        .await?;

    Ok(Created(ApiResponse::ok(message)))
}

/// POST /api/v1/sessions/:session_id/announcements
pub async fn post_announcement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
    ValidatedJson(request): ValidatedJson<AnnounceRequest>,
) -> ApiResult<Created<ApiResponse<ChatMessage>>> {
    let message = state
        .chat()
        .announce(session_id, &user, &request.message)
        .await?;

    Ok(Created(ApiResponse::ok(message)))
}

/// GET /api/v1/sessions/:session_id/messages
pub async fn get_messages(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
    pagination: Pagination,
) -> ApiResult<ApiResponse<HistoryResponse>> {
    let page = state
        .chat()
        .history(session_id, pagination.page, pagination.per_page)
        .await?;

    Ok(ApiResponse::ok(HistoryResponse::from(page)))
}
