//! WebSocket close codes sent by the stream endpoint

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    /// Client sent an op it may not send
    UnknownOpcode = 4001,
    /// Frame was not valid JSON or not a gateway message
    DecodeError = 4002,
    /// Session is not (or no longer) accepting participants
    SessionNotActive = 4003,
    /// Host closed the session
    SessionEnded = 4004,
    /// No heartbeat within two intervals
    HeartbeatTimeout = 4005,
    /// Server dropped the connection, e.g. its queue overflowed or a newer
    /// connection of the same user replaced it
    ConnectionLost = 4006,
}

impl CloseCode {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::SessionNotActive),
            4004 => Some(Self::SessionEnded),
            4005 => Some(Self::HeartbeatTimeout),
            4006 => Some(Self::ConnectionLost),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether reconnecting with `resume_from_seq` can succeed
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(
            self,
            Self::UnknownError | Self::HeartbeatTimeout | Self::ConnectionLost
        )
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload encoding",
            Self::SessionNotActive => "Session is not active",
            Self::SessionEnded => "Session ended",
            Self::HeartbeatTimeout => "Heartbeat timeout",
            Self::ConnectionLost => "Connection lost",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.as_u16(), self)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
