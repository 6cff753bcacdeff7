//! JSON file holding the role prompt set.
//!
//! The file is a single object mapping role id to system instruction:
//!
//! ```json
//! {
//!   "default": "You are a helpful assistant.",
//!   "code": "You are a coding assistant that helps with programming."
//! }
//! ```

use persona_domain::{RolePrompt, RolePromptRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while reading or writing the prompt file.
#[derive(Error, Debug)]
pub enum PromptStoreError {
    #[error("Failed to access prompt file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid prompt file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Prompt file reader/writer.
pub struct JsonPromptStore {
    path: PathBuf,
}

impl JsonPromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the prompt set, writing the built-in set first if the file is
    /// missing.
    pub fn load_or_init(&self) -> Result<Vec<RolePrompt>, PromptStoreError> {
        if !self.path.exists() {
            let prompts = RolePrompt::builtin();
            self.save(&prompts)?;
            info!(path = %self.path.display(), "Wrote default role prompts");
            return Ok(prompts);
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let map: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|source| PromptStoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), roles = map.len(), "Loaded role prompts");

        Ok(map
            .into_iter()
            .map(|(role_id, system_text)| RolePrompt::new(role_id, system_text))
            .collect())
    }

    /// Registry populated from [`load_or_init`](Self::load_or_init).
    pub fn load_registry(&self) -> Result<RolePromptRegistry, PromptStoreError> {
        Ok(RolePromptRegistry::from_prompts(self.load_or_init()?))
    }

    /// Overwrite the file with `prompts`, creating parent directories.
    pub fn save(&self, prompts: &[RolePrompt]) -> Result<(), PromptStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let map: BTreeMap<&str, &str> = prompts
            .iter()
            .map(|p| (p.role_id.as_str(), p.system_text.as_str()))
            .collect();
        let json = serde_json::to_string_pretty(&map).map_err(|source| PromptStoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> PromptStoreError {
        PromptStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_seeded_with_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("prompts.json");
        let store = JsonPromptStore::new(&path);

        let prompts = store.load_or_init().unwrap();
        assert_eq!(prompts, RolePrompt::builtin());
        assert!(path.exists());

        // Non-ASCII role ids survive the round trip through the file
        let registry = store.load_registry().unwrap();
        assert_eq!(registry.len(), 6);
        assert!(registry.contains("知心大姐姐"));
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{"pirate": "Talk like a pirate."}"#).unwrap();

        let registry = JsonPromptStore::new(&path).load_registry().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("pirate").unwrap(), "Talk like a pirate.");
        assert!(!registry.contains("default"));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let error = JsonPromptStore::new(&path).load_or_init().unwrap_err();
        assert!(matches!(error, PromptStoreError::Parse { .. }));
    }
}
