//! Domain layer for persona-chat
//!
//! This crate contains the core conversation entities and the pure rules that
//! govern them. It has no dependencies on infrastructure or presentation
//! concerns.
//!
//! # Core Concepts
//!
//! ## Turns and Exchanges
//!
//! A [`Turn`] is one message from either the user or the assistant. A user
//! turn followed by its assistant reply forms an *exchange*. Context windows
//! are measured in exchanges, never in raw turns, so a pair is always kept or
//! dropped as a unit.
//!
//! ## Roles
//!
//! A role is a named persona whose system instruction is prepended to every
//! prompt. Roles are plain data held in a [`RolePromptRegistry`]; the logic
//! is identical for all of them.

pub mod config;
pub mod context;
pub mod core;
pub mod prompt;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use config::validation::{ConfigIssue, ConfigIssueCode, Severity};
pub use context::window::{ContextWindow, TruncateMode, count_exchanges, truncate};
pub use core::error::DomainError;
pub use prompt::{
    registry::{DEFAULT_ROLE_ID, RolePrompt, RolePromptRegistry},
    request::Prompt,
};
pub use session::{
    entities::{Session, Speaker, Turn},
    stream::{ChunkKind, StreamChunk},
    summary::ContextSummary,
};
