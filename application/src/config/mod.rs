//! Application-level configuration.
//!
//! - [`ChatParams`]: context window, default role, retry and timeout settings
//! - [`RetryPolicy`]: attempt limit and exponential backoff

pub mod chat_params;

pub use chat_params::{ChatParams, RetryPolicy};
