//! Authenticated identity handed to the chat core by the auth collaborator

use serde::{Deserialize, Serialize};

use crate::value_objects::{Capabilities, Snowflake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: Snowflake,
    pub capabilities: Capabilities,
}

impl ChatUser {
    pub fn new(id: Snowflake, capabilities: Capabilities) -> Self {
        Self { id, capabilities }
    }

    /// A user with no special capabilities
    pub fn participant(id: Snowflake) -> Self {
        Self::new(id, Capabilities::empty())
    }

    pub fn host(id: Snowflake) -> Self {
        Self::new(id, Capabilities::HOST)
    }
}
