//! Port for durable conversation history.
//!
//! Defines the [`HistoryRecorder`] trait for appending completed exchanges to
//! an append-only log. This is separate from `tracing`-based operation logs:
//! tracing handles diagnostics, while this port keeps the transcript.
//!
//! Recording is best-effort. The orchestrator logs a failed `record` and
//! carries on; the in-memory session is never rolled back because of it.

use persona_domain::Turn;
use thiserror::Error;

/// Errors from a history backend.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Port for the durable append-only turn log.
pub trait HistoryRecorder: Send + Sync {
    /// Append one turn for `user_id`.
    fn record(&self, user_id: &str, turn: &Turn) -> Result<(), RecorderError>;

    /// Every recorded turn for `user_id`, oldest first.
    fn history(&self, _user_id: &str) -> Result<Vec<Turn>, RecorderError> {
        Ok(Vec::new())
    }
}

/// No-op implementation for tests and when persistence is disabled.
pub struct NoHistoryRecorder;

impl HistoryRecorder for NoHistoryRecorder {
    fn record(&self, _user_id: &str, _turn: &Turn) -> Result<(), RecorderError> {
        Ok(())
    }
}
