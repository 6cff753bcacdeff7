//! Logging infrastructure: durable conversation transcript.
//!
//! Provides [`JsonlHistoryRecorder`], an append-only JSONL file that
//! implements the [`HistoryRecorder`](persona_application::HistoryRecorder)
//! port.

mod jsonl_history;

pub use jsonl_history::JsonlHistoryRecorder;
