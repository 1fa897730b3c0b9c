//! LiveSession entity <-> model mapper

use live_core::{DomainError, LiveSession, Snowflake};

use crate::models::LiveSessionModel;

/// Fails if the stored state string is not a known lifecycle state
impl TryFrom<LiveSessionModel> for LiveSession {
    type Error = DomainError;

    fn try_from(model: LiveSessionModel) -> Result<Self, Self::Error> {
        Ok(LiveSession {
            id: Snowflake::new(model.id),
            host_id: Snowflake::new(model.host_id),
            state: model.state.parse()?,
            scheduled_start: model.scheduled_start,
            started_at: model.started_at,
            ended_at: model.ended_at,
        })
    }
}
