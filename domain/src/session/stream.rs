//! Streaming chunks for incrementally delivered replies.
//!
//! A streamed reply is a sequence of [`StreamChunk`]s: zero or more
//! [`ChunkKind::Content`] chunks followed by exactly one terminal chunk of
//! kind [`ChunkKind::Done`] or [`ChunkKind::Error`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle kind of a stream chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// A fragment of reply text.
    Content,
    /// The reply finished and was stored in the session.
    Done,
    /// The reply failed; `content` carries the error message.
    Error,
}

/// One incremental unit of a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub kind: ChunkKind,
    pub timestamp: DateTime<Utc>,
    pub current_role: String,
}

impl StreamChunk {
    pub fn content(text: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(ChunkKind::Content, text, role)
    }

    pub fn done(role: impl Into<String>) -> Self {
        Self::new(ChunkKind::Done, String::new(), role)
    }

    pub fn error(message: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(ChunkKind::Error, message, role)
    }

    fn new(kind: ChunkKind, content: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind,
            timestamp: Utc::now(),
            current_role: role.into(),
        }
    }

    /// Returns true if this chunk ends the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ChunkKind::Done | ChunkKind::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_chunk_is_not_terminal() {
        let chunk = StreamChunk::content("Once ", "default");
        assert_eq!(chunk.kind, ChunkKind::Content);
        assert_eq!(chunk.content, "Once ");
        assert!(!chunk.is_terminal());
    }

    #[test]
    fn test_done_and_error_are_terminal() {
        assert!(StreamChunk::done("default").is_terminal());

        let error = StreamChunk::error("boom", "code");
        assert!(error.is_terminal());
        assert_eq!(error.content, "boom");
        assert_eq!(error.current_role, "code");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let chunk = StreamChunk::done("default");
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["kind"], "done");
        assert_eq!(value["current_role"], "default");
    }
}
