//! Turn types for conversations.

use chainlab_core::TurnId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User/human turn.
    User,
    /// Assistant/AI turn.
    Assistant,
    /// System instruction.
    System,
}

impl Role {
    /// Returns the lowercase role name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a conversation.
///
/// Turns are immutable once created; a session only ever appends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    /// Creates a new turn.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system turn.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Unique turn identifier.
    #[must_use]
    pub fn id(&self) -> TurnId {
        self.id
    }

    /// Who authored the turn.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Message body.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// When the turn was created.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_creation() {
        let turn = Turn::user("Hello!");
        assert_eq!(turn.role(), Role::User);
        assert_eq!(turn.content(), "Hello!");
    }

    #[test]
    fn role_names_are_lowercase() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        let json = serde_json::to_string(&Role::System).expect("serialize");
        assert_eq!(json, "\"system\"");
    }

    #[test]
    fn turn_serde_roundtrip() {
        let turn = Turn::assistant("Here's the result:");

        let json = serde_json::to_string(&turn).expect("serialize");
        let parsed: Turn = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(turn, parsed);
        assert!(json.contains("\"role\":\"assistant\""));
    }
}
