//! Completion client port
//!
//! Defines the interface for sending a prompt to a remote language model,
//! either as one buffered call or as an incremental fragment stream.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use persona_domain::Prompt;
use thiserror::Error;

/// Errors surfaced by a completion backend.
///
/// Adapters classify failures before returning them; the orchestrator only
/// asks [`is_transient`](Self::is_transient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Completion error: {0}")]
    Other(String),
}

impl CompletionError {
    /// Whether retrying the identical request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CompletionError::Timeout
                | CompletionError::RateLimited(_)
                | CompletionError::Network(_)
                | CompletionError::ServerError { .. }
        )
    }
}

/// One incremental piece of reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Fragments of a streamed reply. Exhaustion means a clean finish; an `Err`
/// item means the stream failed and no more items follow.
pub type FragmentStream = BoxStream<'static, Result<Fragment, CompletionError>>;

/// Client for a remote completion service
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the prompt and wait for the full reply text.
    async fn complete(&self, prompt: &Prompt) -> Result<String, CompletionError>;

    /// Send the prompt and receive the reply incrementally.
    ///
    /// Default implementation calls `complete()` and yields its result as a
    /// single fragment, so buffered-only backends work unchanged.
    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, CompletionError> {
        let text = self.complete(prompt).await?;
        Ok(futures::stream::once(async move { Ok(Fragment::new(text)) }).boxed())
    }
}
