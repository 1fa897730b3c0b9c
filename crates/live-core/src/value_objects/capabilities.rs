//! Capability flags carried by an authenticated user
//!
//! The external auth collaborator encodes these as a list of names
//! (`"host"`, `"moderator"`) in the access token.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// What a user may do inside live sessions beyond plain chatting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// May schedule, open and close sessions, and post announcements
        const HOST     = 1 << 0;
        /// May post announcements and close sessions they do not host
        const MODERATE = 1 << 1;
    }
}

impl Capabilities {
    /// Whether the holder may flag a message as an announcement
    #[inline]
    pub fn can_announce(&self) -> bool {
        self.intersects(Self::HOST | Self::MODERATE)
    }

    /// Whether the holder may open or schedule sessions
    #[inline]
    pub fn can_host(&self) -> bool {
        self.contains(Self::HOST)
    }

    /// Parse a single capability name; unknown names yield `None`
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "host" => Some(Self::HOST),
            "moderator" | "moderate" => Some(Self::MODERATE),
            _ => None,
        }
    }

    /// Build a set from names, silently ignoring unknown entries
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|n| Self::parse_name(n.as_ref()))
            .fold(Self::empty(), |acc, c| acc | c)
    }

    /// Names of the contained flags, in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::HOST) {
            names.push("host");
        }
        if self.contains(Self::MODERATE) {
            names.push("moderator");
        }
        names
    }
}

impl Serialize for Capabilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.names().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_names(names))
    }
}
