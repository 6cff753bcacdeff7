//! Conversation session domain.
//!
//! - [`entities::Session`]: one user's dialogue state (turns + active role)
//! - [`entities::Turn`]: a single immutable message within a session
//! - [`stream::StreamChunk`]: one unit of an incrementally delivered reply
//! - [`summary::ContextSummary`]: read-only overview of a session

pub mod entities;
pub mod stream;
pub mod summary;
