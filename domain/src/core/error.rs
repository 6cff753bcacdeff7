//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("max_turns must be at least 1 (got {0})")]
    InvalidMaxTurns(usize),

    #[error("Unknown truncate mode: {0}")]
    InvalidTruncateMode(String),
}

impl DomainError {
    /// Check if this error is a role lookup failure
    pub fn is_unknown_role(&self) -> bool {
        matches!(self, DomainError::UnknownRole(_))
    }
}
