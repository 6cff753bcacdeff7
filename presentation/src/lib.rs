//! Presentation layer for persona-chat
//!
//! This crate contains CLI definitions, output formatters
//! and the interactive chat interface.

pub mod chat;
pub mod cli;
pub mod output;

// Re-export commonly used types
pub use chat::{ChatRepl, ReplCommand, print_stream};
pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ConsoleFormatter;
