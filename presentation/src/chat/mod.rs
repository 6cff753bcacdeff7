//! Interactive chat module
//!
//! Provides a line-based interactive chat interface over stdin.

mod command;
mod repl;

pub use command::ReplCommand;
pub use repl::{ChatRepl, print_stream};
