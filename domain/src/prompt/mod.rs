//! Prompt domain.
//!
//! - [`registry::RolePromptRegistry`]: role id to system instruction map
//! - [`request::Prompt`]: the system instruction plus turn history sent to a model

pub mod registry;
pub mod request;
