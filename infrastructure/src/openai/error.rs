//! Error types for the OpenAI-compatible adapter

use persona_application::CompletionError;
use thiserror::Error;

/// Errors that can occur when talking to the completion endpoint
#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response contained no choices")]
    EmptyResponse,
}

impl OpenAiError {
    /// Build a status error, preferring the `error.message` field of a JSON
    /// error body over the raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| json["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| body.trim().to_string());
        OpenAiError::Status { status, message }
    }
}

impl From<OpenAiError> for CompletionError {
    fn from(error: OpenAiError) -> Self {
        match error {
            OpenAiError::Http(e) if e.is_timeout() => CompletionError::Timeout,
            OpenAiError::Http(e) if e.is_builder() => CompletionError::InvalidRequest(e.to_string()),
            OpenAiError::Http(e) if e.is_decode() => CompletionError::Other(e.to_string()),
            OpenAiError::Http(e) => CompletionError::Network(e.to_string()),
            OpenAiError::Status { status, message } => classify_status(status, message),
            e @ (OpenAiError::Decode(_) | OpenAiError::EmptyResponse) => {
                CompletionError::Other(e.to_string())
            }
        }
    }
}

/// 408, 429 and 5xx may succeed on retry; other statuses will not.
fn classify_status(status: u16, message: String) -> CompletionError {
    match status {
        408 => CompletionError::Timeout,
        429 => CompletionError::RateLimited(message),
        401 | 403 => CompletionError::Authentication(message),
        500..=599 => CompletionError::ServerError { status, message },
        _ => CompletionError::InvalidRequest(format!("HTTP {status}: {message}")),
    }
}
