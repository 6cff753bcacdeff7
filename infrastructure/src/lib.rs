//! Infrastructure layer for persona-chat
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod config;
pub mod logging;
pub mod openai;
pub mod prompts;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileConfig, FileConversationConfig, FileProviderConfig, FileRetryConfig,
    FileStorageConfig,
};
pub use logging::JsonlHistoryRecorder;
pub use openai::{OpenAiCompletionClient, OpenAiError, OpenAiSettings};
pub use prompts::{JsonPromptStore, PromptStoreError};
