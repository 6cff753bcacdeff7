//! Read-only overview of a session's context.

use super::entities::Session;
use crate::context::window::count_exchanges;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one user's current context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub turn_count: usize,
    pub exchange_count: usize,
    pub max_turns: usize,
    pub current_role: String,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub newest_timestamp: Option<DateTime<Utc>>,
}

impl ContextSummary {
    /// Summary for a user that has no session yet.
    pub fn empty(role: impl Into<String>, max_turns: usize) -> Self {
        Self {
            turn_count: 0,
            exchange_count: 0,
            max_turns,
            current_role: role.into(),
            oldest_timestamp: None,
            newest_timestamp: None,
        }
    }

    pub fn of(session: &Session, max_turns: usize) -> Self {
        let turns = session.turns();
        Self {
            turn_count: turns.len(),
            exchange_count: count_exchanges(turns),
            max_turns,
            current_role: session.current_role().to_string(),
            oldest_timestamp: turns.first().map(|t| t.timestamp()),
            newest_timestamp: turns.last().map(|t| t.timestamp()),
        }
    }

    pub fn has_context(&self) -> bool {
        self.turn_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::entities::{Speaker, Turn};
    use chrono::TimeZone;

    #[test]
    fn test_empty_summary() {
        let summary = ContextSummary::empty("default", 10);
        assert_eq!(summary.turn_count, 0);
        assert!(!summary.has_context());
        assert!(summary.oldest_timestamp.is_none());
    }

    #[test]
    fn test_summary_of_session() {
        let t0 = Utc.with_ymd_and_hms(2024, 12, 12, 16, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 12, 12, 16, 0, 5).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 12, 12, 16, 1, 0).unwrap();

        let mut session = Session::new("u1", "code");
        session.replace_turns(vec![
            Turn::new(Speaker::User, "q1", t0),
            Turn::new(Speaker::Assistant, "a1", t1),
            Turn::new(Speaker::User, "q2", t2),
        ]);

        let summary = ContextSummary::of(&session, 4);
        assert_eq!(summary.turn_count, 3);
        assert_eq!(summary.exchange_count, 2);
        assert_eq!(summary.max_turns, 4);
        assert_eq!(summary.current_role, "code");
        assert_eq!(summary.oldest_timestamp, Some(t0));
        assert_eq!(summary.newest_timestamp, Some(t2));
        assert!(summary.has_context());
    }
}
