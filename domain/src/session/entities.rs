//! Session domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Wire name used by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation (Entity)
///
/// Turns are immutable once created; fields are only readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    speaker: Speaker,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text, Utc::now())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text, Utc::now())
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_user(&self) -> bool {
        self.speaker == Speaker::User
    }

    pub fn is_assistant(&self) -> bool {
        self.speaker == Speaker::Assistant
    }
}

/// Dialogue state for a single user (Entity)
///
/// Created lazily on the first message from a user. Turns are only ever
/// replaced wholesale by the session store after truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user_id: String,
    turns: Vec<Turn>,
    current_role: String,
    last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            turns: Vec::new(),
            current_role: role.into(),
            last_activity: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn current_role(&self) -> &str {
        &self.current_role
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Replace the whole turn sequence (result of append + truncate).
    pub fn replace_turns(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
        self.touch();
    }

    pub fn set_current_role(&mut self, role: impl Into<String>) {
        self.current_role = role.into();
        self.touch();
    }

    /// Drop all turns and return to `role`.
    pub fn reset(&mut self, role: impl Into<String>) {
        self.turns.clear();
        self.current_role = role.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
