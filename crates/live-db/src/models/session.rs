//! Live session database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the live_sessions table
#[derive(Debug, Clone, FromRow)]
pub struct LiveSessionModel {
    pub id: i64,
    pub host_id: i64,
    pub state: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}
