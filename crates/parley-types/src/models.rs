use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix that marks a conversation peer as a group rather than a user.
pub const GROUP_PEER_PREFIX: &str = "g-";

/// Read state of a message as seen by its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkmark {
    /// Stored for every recipient, not yet read by all of them.
    Delivered,
    /// Every recipient has read it.
    Read,
}

impl Checkmark {
    /// Number of ticks a client renders: one for delivered, two for read.
    pub fn ticks(self) -> u8 {
        match self {
            Self::Delivered => 1,
            Self::Read => 2,
        }
    }
}

/// The other side of a conversation: a user for direct chats, a group id
/// otherwise. Renders as the raw user id or as `g-<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationPeer {
    Direct(String),
    Group(i64),
}

impl ConversationPeer {
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl fmt::Display for ConversationPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(user_id) => f.write_str(user_id),
            Self::Group(group_id) => write!(f, "{GROUP_PEER_PREFIX}{group_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsePeerError {
    #[error("empty conversation peer")]
    Empty,
    #[error("invalid group reference: {0}")]
    InvalidGroup(String),
}

impl FromStr for ConversationPeer {
    type Err = ParsePeerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParsePeerError::Empty);
        }
        match s.strip_prefix(GROUP_PEER_PREFIX) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id > 0 => Ok(Self::Group(id)),
                _ => Err(ParsePeerError::InvalidGroup(s.to_string())),
            },
            None => Ok(Self::Direct(s.to_string())),
        }
    }
}

impl Serialize for ConversationPeer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConversationPeer {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// User identifiers are 3 to 16 characters of ASCII alphanumerics, `_` or `-`,
/// and never start with the group prefix so a peer id is unambiguous.
pub fn is_valid_identifier(id: &str) -> bool {
    (3..=16).contains(&id.len())
        && !id.starts_with(GROUP_PEER_PREFIX)
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_peer_parses_and_renders() {
        let peer: ConversationPeer = "g-42".parse().unwrap();
        assert_eq!(peer, ConversationPeer::Group(42));
        assert_eq!(peer.to_string(), "g-42");
        assert!(peer.is_group());
    }

    #[test]
    fn anything_else_is_a_direct_peer() {
        let peer: ConversationPeer = "alice".parse().unwrap();
        assert_eq!(peer, ConversationPeer::Direct("alice".into()));
        assert_eq!(peer.to_string(), "alice");
    }

    #[test]
    fn malformed_group_reference_is_rejected() {
        assert!(matches!("g-".parse::<ConversationPeer>(), Err(ParsePeerError::InvalidGroup(_))));
        assert!(matches!("g-0".parse::<ConversationPeer>(), Err(ParsePeerError::InvalidGroup(_))));
        assert!(matches!("g-x1".parse::<ConversationPeer>(), Err(ParsePeerError::InvalidGroup(_))));
        assert_eq!("  ".parse::<ConversationPeer>(), Err(ParsePeerError::Empty));
    }

    #[test]
    fn checkmark_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Checkmark::Read).unwrap(), "\"read\"");
        assert_eq!(Checkmark::Delivered.ticks(), 1);
        assert_eq!(Checkmark::Read.ticks(), 2);
    }

    #[test]
    fn identifier_rules() {
        assert!(is_valid_identifier("bob"));
        assert!(is_valid_identifier("user_01-x"));
        assert!(!is_valid_identifier("ab"));
        assert!(!is_valid_identifier("seventeen-chars-x"));
        assert!(!is_valid_identifier("no spaces"));
        assert!(!is_valid_identifier("g-1"));
        assert!(!is_valid_identifier("g-team"));
        assert!(is_valid_identifier("gg-1"));
    }
}
