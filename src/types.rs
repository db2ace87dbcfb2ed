//! Core result types for the chat core
//!
//! All serializable types use camelCase JSON for wire compatibility.

use serde::{Deserialize, Serialize};

/// Wire sentinel for "no such session" / "no such client"
pub const NOT_FOUND_SENTINEL: &str = "not exist";

/// Externally visible identity of a live session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Session name (unique)
    pub name: String,

    /// Client id that created the session
    pub creator: String,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creator: creator.into(),
        }
    }
}

/// Result of `enter_session`
///
/// A missing room is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "participants")]
pub enum EnterOutcome {
    /// Joined; participant list after the join, in join order
    Entered(Vec<String>),
    /// No session with that name
    NotFound,
}

impl EnterOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Participant list, if the join succeeded
    pub fn participants(&self) -> Option<&[String]> {
        match self {
            Self::Entered(list) => Some(list),
            Self::NotFound => None,
        }
    }

    /// Legacy list encoding: `["not exist"]` for a missing room
    pub fn into_wire(self) -> Vec<String> {
        match self {
            Self::Entered(list) => list,
            Self::NotFound => vec![NOT_FOUND_SENTINEL.to_string()],
        }
    }
}

/// Where a client currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "session")]
pub enum ClientLocation {
    /// Never started, or quit
    Unknown,
    /// Known but not in any session
    Idle,
    /// Occupying the named session
    InSession(String),
}

impl ClientLocation {
    /// Build from a raw position record (`""` = idle)
    pub fn from_position(position: Option<String>) -> Self {
        match position {
            None => Self::Unknown,
            Some(name) if name.is_empty() => Self::Idle,
            Some(name) => Self::InSession(name),
        }
    }

    pub fn session(&self) -> Option<&str> {
        match self {
            Self::InSession(name) => Some(name),
            _ => None,
        }
    }

    /// Legacy string encoding: session name, `""` when idle, `"not exist"` when unknown
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Unknown => NOT_FOUND_SENTINEL,
            Self::Idle => "",
            Self::InSession(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_entry_serialization() {
        let entry = DirectoryEntry::new("lobby", "alice");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"lobby","creator":"alice"}"#);
    }

    #[test]
    fn test_enter_outcome_wire() {
        let entered = EnterOutcome::Entered(vec!["bob".to_string()]);
        assert_eq!(entered.participants(), Some(&["bob".to_string()][..]));
        assert_eq!(entered.into_wire(), vec!["bob"]);

        assert!(EnterOutcome::NotFound.is_not_found());
        assert_eq!(EnterOutcome::NotFound.into_wire(), vec!["not exist"]);
    }

    #[test]
    fn test_enter_outcome_json() {
        let json = serde_json::to_value(EnterOutcome::Entered(vec!["bob".into()])).unwrap();
        assert_eq!(json["status"], "entered");
        assert_eq!(json["participants"][0], "bob");

        let json = serde_json::to_value(EnterOutcome::NotFound).unwrap();
        assert_eq!(json["status"], "notFound");
    }

    #[test]
    fn test_client_location_from_position() {
        assert_eq!(ClientLocation::from_position(None), ClientLocation::Unknown);
        assert_eq!(ClientLocation::from_position(Some(String::new())), ClientLocation::Idle);
        assert_eq!(
            ClientLocation::from_position(Some("lobby".into())),
            ClientLocation::InSession("lobby".into())
        );
    }

    #[test]
    fn test_client_location_wire() {
        assert_eq!(ClientLocation::Unknown.as_wire(), "not exist");
        assert_eq!(ClientLocation::Idle.as_wire(), "");
        assert_eq!(ClientLocation::InSession("lobby".into()).as_wire(), "lobby");
        assert_eq!(ClientLocation::InSession("lobby".into()).session(), Some("lobby"));
    }
}
