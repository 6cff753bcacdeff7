//! Configuration file loading for persona-chat
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `PERSONA_`-prefixed environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./persona.toml` or `./.persona.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/persona-chat/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileConversationConfig, FileProviderConfig, FileRetryConfig, FileStorageConfig,
};
pub use loader::ConfigLoader;
