//! Application layer for persona-chat
//!
//! This crate contains the session store, the chat orchestration use case,
//! and the port definitions that infrastructure adapters implement.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod session_store;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ChatParams, RetryPolicy};
pub use ports::{
    completion_client::{CompletionClient, CompletionError, Fragment, FragmentStream},
    history_recorder::{HistoryRecorder, NoHistoryRecorder, RecorderError},
};
pub use session_store::{ExchangeGuard, SessionStore};
pub use use_cases::chat::{ChatError, ChatOrchestrator, ChatResponse, ChatStream};
