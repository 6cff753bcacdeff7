//! Exchange-based context truncation.
//!
//! Turns are grouped into *exchanges* before any truncation decision:
//!
//! ```text
//! [User, Assistant]  one completed exchange
//! [User]             one unanswered exchange (reply failed earlier)
//! [Assistant]        orphan, never valid, always dropped
//! ```
//!
//! A user turn at the very end is the message awaiting its reply. It sits
//! outside the window: it always survives and is not counted, so the model
//! sees `max_turns` earlier exchanges plus the new message.
//!
//! The window bounds the number of counted exchanges, so a user/assistant
//! pair is never split. Once the reply is appended the session holds at most
//! `2 * max_turns` turns; while a reply is pending it holds one more.

use crate::core::error::DomainError;
use crate::session::entities::Turn;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;

/// What to drop once a session exceeds its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateMode {
    /// Drop the oldest exchanges first until the window fits.
    #[default]
    Sliding,
    /// Drop every completed exchange; only a trailing pending user turn survives.
    Clear,
}

impl TruncateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruncateMode::Sliding => "sliding",
            TruncateMode::Clear => "clear",
        }
    }
}

impl std::fmt::Display for TruncateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TruncateMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sliding" => Ok(TruncateMode::Sliding),
            "clear" => Ok(TruncateMode::Clear),
            other => Err(DomainError::InvalidTruncateMode(other.to_string())),
        }
    }
}

/// Bound on the number of exchanges a session retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    max_turns: usize,
    mode: TruncateMode,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            max_turns: 10,
            mode: TruncateMode::Sliding,
        }
    }
}

impl ContextWindow {
    /// Create a window; `max_turns` must be at least 1.
    pub fn try_new(max_turns: usize, mode: TruncateMode) -> Result<Self, DomainError> {
        if max_turns == 0 {
            return Err(DomainError::InvalidMaxTurns(max_turns));
        }
        Ok(Self { max_turns, mode })
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn mode(&self) -> TruncateMode {
        self.mode
    }

    pub fn with_max_turns(self, max_turns: usize) -> Result<Self, DomainError> {
        Self::try_new(max_turns, self.mode)
    }

    pub fn with_mode(mut self, mode: TruncateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Apply this window to `turns`, returning the turns that survive.
    pub fn apply(&self, turns: &[Turn]) -> Vec<Turn> {
        let (counted, pending) = split_pending(turns);
        if counted.len() <= self.max_turns {
            return collect(turns, &counted, pending);
        }

        match self.mode {
            TruncateMode::Sliding => {
                collect(turns, &counted[counted.len() - self.max_turns..], pending)
            }
            TruncateMode::Clear => collect(turns, &[], pending),
        }
    }
}

/// Sliding-window truncation to at most `max_turns` exchanges.
///
/// Oldest exchanges are dropped first. A trailing user turn still waiting for
/// its reply is not counted and always survives. Pure and deterministic:
/// applying it to its own output with the same bound returns the output
/// unchanged.
pub fn truncate(turns: &[Turn], max_turns: usize) -> Vec<Turn> {
    let (counted, pending) = split_pending(turns);
    let keep_from = counted.len().saturating_sub(max_turns);
    collect(turns, &counted[keep_from..], pending)
}

/// Number of exchanges (completed or pending) in `turns`.
pub fn count_exchanges(turns: &[Turn]) -> usize {
    exchanges(turns).len()
}

fn exchanges(turns: &[Turn]) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < turns.len() {
        if !turns[i].is_user() {
            // orphan assistant turn
            i += 1;
            continue;
        }
        let end = if turns.get(i + 1).is_some_and(Turn::is_assistant) {
            i + 2
        } else {
            i + 1
        };
        groups.push(i..end);
        i = end;
    }
    groups
}

/// Separate a trailing unanswered user turn from the exchanges before it.
fn split_pending(turns: &[Turn]) -> (Vec<Range<usize>>, Option<Range<usize>>) {
    let mut groups = exchanges(turns);
    let pending = match groups.last() {
        Some(last) if last.len() == 1 && last.end == turns.len() => groups.pop(),
        _ => None,
    };
    (groups, pending)
}

fn collect(turns: &[Turn], groups: &[Range<usize>], pending: Option<Range<usize>>) -> Vec<Turn> {
    groups
        .iter()
        .cloned()
        .chain(pending)
        .flat_map(|range| turns[range].iter().cloned())
        .collect()
}
