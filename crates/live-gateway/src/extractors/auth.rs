//! Authentication extractor
//!
//! Reads the access token from the `Authorization: Bearer` header or, for
//! WebSocket upgrades where browsers cannot set headers, the `token` query
//! parameter.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use live_core::ChatUser;
use serde::Deserialize;

use crate::response::ApiError;
use crate::state::AppState;

/// Caller identity resolved from a valid access token
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub ChatUser);

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

async fn bearer_token<S>(parts: &mut Parts, state: &S) -> Option<String>
where
    S: Send + Sync,
{
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    {
        return Some(bearer.token().to_string());
    }

    Query::<TokenQuery>::from_request_parts(parts, state)
        .await
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state)
            .await
            .ok_or(ApiError::MissingAuth)?;

        let app_state = AppState::from_ref(state);
        let user = app_state.jwt_service().authenticate(&token).map_err(|e| {
            tracing::warn!(error = %e, "Rejected access token");
            ApiError::App(e)
        })?;

        Ok(AuthUser(user))
    }
}
