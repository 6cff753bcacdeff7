//! Storage locations from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File locations for durable data. Relative paths resolve against the
/// current directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Append-only JSONL transcript of completed exchanges.
    pub history_path: PathBuf,
    /// JSON object mapping role id to system instruction.
    pub prompts_path: PathBuf,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("data/conversations.jsonl"),
            prompts_path: PathBuf::from("data/prompts.json"),
        }
    }
}
