//! Completion endpoint configuration from TOML (`[provider]` section)

use persona_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MODEL: &str = "qwen2.5:0.5b";

/// OpenAI-compatible endpoint settings.
///
/// # Example
///
/// ```toml
/// [provider]
/// base_url = "http://127.0.0.1:11434/v1"
/// model = "qwen2.5:0.5b"
/// api_key_env = "OPENAI_API_KEY"
/// temperature = 0.7
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Environment variable holding the API key. The key itself never lives
    /// in the file.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    /// Per-call timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/v1".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 1.0,
            timeout_secs: 60,
        }
    }
}

impl FileProviderConfig {
    /// Model name, falling back to the default when empty.
    pub fn parse_model(&self) -> (String, Vec<ConfigIssue>) {
        if self.model.trim().is_empty() {
            let issue = ConfigIssue::warning(
                ConfigIssueCode::EmptyValue {
                    field: "provider.model".to_string(),
                },
                format!("provider.model is empty, falling back to '{DEFAULT_MODEL}'"),
            );
            return (DEFAULT_MODEL.to_string(), vec![issue]);
        }
        (self.model.trim().to_string(), vec![])
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default() {
        let config = FileProviderConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:11434/v1");
        assert_eq!(config.model, "qwen2.5:0.5b");
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_empty_model_falls_back() {
        let config = FileProviderConfig {
            model: "  ".to_string(),
            ..Default::default()
        };
        let (model, issues) = config.parse_model();
        assert_eq!(model, DEFAULT_MODEL);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0].code, ConfigIssueCode::EmptyValue { .. }));
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let config = FileProviderConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_api_key_missing_env_is_none() {
        let config = FileProviderConfig {
            api_key_env: "PERSONA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert_eq!(config.api_key(), None);
    }
}
