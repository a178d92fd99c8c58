use serde::{Deserialize, Serialize};

/// Channel used when a client does not name one
pub const DEFAULT_CHANNEL: &str = "global";

/// Leaderboard channel (the "game") identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    #[must_use]
    pub const fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Resolve an optional client-supplied identifier.
    /// Absent and empty values both map to the default channel.
    #[must_use]
    pub fn or_default(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.trim().is_empty() => Self(id),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self(DEFAULT_CHANNEL.to_string())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Member identity as resolved from a validated bearer credential
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    #[must_use]
    pub const fn from_string(id: String) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_defaults_to_global() {
        assert_eq!(ChannelId::or_default(None).as_str(), "global");
        assert_eq!(ChannelId::or_default(Some(String::new())).as_str(), "global");
        assert_eq!(ChannelId::or_default(Some("  ".to_string())).as_str(), "global");
        assert_eq!(ChannelId::or_default(Some("game1".to_string())).as_str(), "game1");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ChannelId::from("game1")).unwrap();
        assert_eq!(json, "\"game1\"");

        let member: MemberId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(member.as_str(), "alice");
    }
}
