//! Session lifecycle handlers

use axum::extract::State;
use chrono::{DateTime, Utc};
use live_core::{LiveSession, Snowflake};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extractors::{AuthUser, SessionIdPath, ValidatedJson};
use crate::response::{ApiResponse, ApiResult, Created};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleSessionRequest {
    /// Id chosen by the caller; generated when absent
    #[serde(default)]
    pub session_id: Option<Snowflake>,
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub session_id: Snowflake,
    pub participants: Vec<Snowflake>,
}

/// POST /api/v1/sessions
pub async fn schedule_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<ScheduleSessionRequest>,
) -> ApiResult<Created<ApiResponse<LiveSession>>> {
    let session = state
        .chat()
        .schedule_session(&user, request.session_id, request.scheduled_start)
        .await?;

    Ok(Created(
        ApiResponse::ok(session).with_message("Session scheduled"),
    ))
}

/// POST /api/v1/sessions/:session_id/open
pub async fn open_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
) -> ApiResult<ApiResponse<LiveSession>> {
    let session = state.chat().open_session(&user, session_id).await?;
    Ok(ApiResponse::ok(session).with_message("Session opened"))
}

/// POST /api/v1/sessions/:session_id/close
pub async fn close_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
) -> ApiResult<ApiResponse<LiveSession>> {
    let session = state.chat().close_session(&user, session_id).await?;
    Ok(ApiResponse::ok(session).with_message("Session closed"))
}

/// GET /api/v1/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
) -> ApiResult<ApiResponse<LiveSession>> {
    let session = state.chat().session(session_id).await?;
    Ok(ApiResponse::ok(session))
}

/// GET /api/v1/sessions/:session_id/participants
pub async fn get_participants(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
) -> ApiResult<ApiResponse<ParticipantsResponse>> {
    let participants = state.chat().participants(session_id).await?;
    Ok(ApiResponse::ok(ParticipantsResponse {
        session_id,
        participants,
    }))
}
