//! Prompt value sent to a completion backend.

use crate::session::entities::Turn;
use serde::{Deserialize, Serialize};

/// System instruction plus the ordered turn history for one model call.
///
/// Built once per chat call and reused unchanged across retry attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system_text: String,
    pub turns: Vec<Turn>,
}

impl Prompt {
    pub fn new(system_text: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            system_text: system_text.into(),
            turns,
        }
    }

    /// The most recent user message, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.is_user())
            .map(Turn::text)
    }
}
