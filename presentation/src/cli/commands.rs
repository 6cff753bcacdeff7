//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for single-shot replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Reply text only
    Text,
    /// Reply with role and timestamp as JSON (implies --no-stream)
    Json,
}

/// CLI arguments for persona-chat
#[derive(Parser, Debug)]
#[command(name = "persona-chat")]
#[command(author, version, about = "Role-playing chat over an OpenAI-compatible model")]
#[command(long_about = r#"
persona-chat keeps a short conversation history per user and answers under a
selectable persona (role). Each role is a system instruction loaded from the
prompts file.

Configuration files are loaded from (in priority order):
1. PERSONA_* environment variables (e.g. PERSONA_PROVIDER__MODEL)
2. --config <path>     Explicit config file
3. ./persona.toml      Project-level config
4. ~/.config/persona-chat/config.toml   Global config

Example:
  persona-chat "Give me three names for a cat"
  persona-chat --role code --no-stream "What does Box<dyn Fn()> mean?"
  persona-chat --chat --user alice
"#)]
pub struct Cli {
    /// Message to send (not required in chat mode)
    pub message: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Role to answer as; switches the session's role
    #[arg(short, long, value_name = "ROLE")]
    pub role: Option<String>,

    /// Wait for the full reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// User id whose session is used
    #[arg(short, long, value_name = "ID", default_value = "cli")]
    pub user: String,

    /// Output format for single-shot mode
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Whether single-shot mode should use the buffered call.
    pub fn buffered(&self) -> bool {
        self.no_stream || self.output == OutputFormat::Json
    }
}
