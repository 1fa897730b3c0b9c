//! Gateway message format

use live_core::{ChatMessage, Snowflake};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OpCode;

/// Dispatch event names (`t`)
pub mod event_names {
    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
    pub const READY: &str = "READY";
    pub const SESSION_ENDED: &str = "SESSION_ENDED";
}

/// Every frame on the stream, in both directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: OpCode,

    /// Event name (dispatch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Message seq (`MESSAGE_CREATE` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// Payload of op 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Milliseconds between client heartbeats
    pub heartbeat_interval: u64,
}

/// Payload of the `READY` dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub session_id: Snowflake,
    /// Highest seq delivered by the replay; live events follow
    pub last_seq: i64,
}

impl GatewayMessage {
    fn new(op: OpCode) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d: None,
        }
    }

    fn dispatch(event: &str, seq: Option<i64>, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event.to_string()),
            s: seq,
            d: Some(data),
        }
    }

    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self {
            d: serde_json::to_value(HelloPayload { heartbeat_interval }).ok(),
            ..Self::new(OpCode::Hello)
        }
    }

    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck)
    }

    pub fn message_create(message: &ChatMessage) -> Result<Self, serde_json::Error> {
        Ok(Self::dispatch(
            event_names::MESSAGE_CREATE,
            Some(message.seq),
            serde_json::to_value(message)?,
        ))
    }

    pub fn ready(session_id: Snowflake, last_seq: i64) -> Result<Self, serde_json::Error> {
        Ok(Self::dispatch(
            event_names::READY,
            None,
            serde_json::to_value(ReadyPayload {
                session_id,
                last_seq,
            })?,
        ))
    }

    #[must_use]
    pub fn session_ended(session_id: Snowflake) -> Self {
        Self::dispatch(
            event_names::SESSION_ENDED,
            None,
            serde_json::json!({ "session_id": session_id }),
        )
    }

    /// Whether this is a dispatch named `event`
    pub fn is_event(&self, event: &str) -> bool {
        self.op == OpCode::Dispatch && self.t.as_deref() == Some(event)
    }

    /// Decode the payload
    pub fn data<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.t, self.s) {
            (Some(t), Some(s)) => write!(f, "GatewayMessage(op={}, t={t}, s={s})", self.op),
            (Some(t), None) => write!(f, "GatewayMessage(op={}, t={t})", self.op),
            _ => write!(f, "GatewayMessage(op={})", self.op),
        }
    }
}
