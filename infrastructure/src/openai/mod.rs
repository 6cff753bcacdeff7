//! OpenAI-compatible chat completion adapter.
//!
//! - [`client::OpenAiCompletionClient`]: `POST {base_url}/chat/completions`,
//!   buffered or streamed
//! - [`sse`]: server-sent event framing for streamed replies
//! - [`error::OpenAiError`]: transport errors, classified into
//!   [`CompletionError`](persona_application::CompletionError) at the port

pub mod client;
pub mod error;
pub mod sse;
mod types;

pub use client::{OpenAiCompletionClient, OpenAiSettings};
pub use error::OpenAiError;
