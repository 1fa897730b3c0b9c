//! Path parameter extractors

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use live_core::Snowflake;
use serde::Deserialize;

use crate::response::ApiError;

#[derive(Debug, Deserialize)]
struct SessionIdParams {
    session_id: String,
}

/// `:session_id` parsed as a [`Snowflake`]
#[derive(Debug, Clone, Copy)]
pub struct SessionIdPath(pub Snowflake);

#[async_trait]
impl<S> FromRequestParts<S> for SessionIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<SessionIdParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        let id = params
            .session_id
            .parse()
            .map_err(|_| ApiError::invalid_path("Invalid session_id format"))?;
        Ok(SessionIdPath(id))
    }
}
