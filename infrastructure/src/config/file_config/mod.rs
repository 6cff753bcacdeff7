//! Raw TOML configuration data types
//!
//! These structs mirror the config file one section at a time. Values are
//! kept as written; conversion into domain and application types happens in
//! the `to_*` / `parse_*` methods, which report problems as [`ConfigIssue`]s
//! and substitute defaults.

mod conversation;
mod provider;
mod retry;
mod storage;

pub use conversation::FileConversationConfig;
pub use provider::FileProviderConfig;
pub use retry::FileRetryConfig;
pub use storage::FileStorageConfig;

use persona_application::ChatParams;
use persona_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Completion endpoint settings
    pub provider: FileProviderConfig,
    /// Durable file locations
    pub storage: FileStorageConfig,
    /// Context window and default role
    pub conversation: FileConversationConfig,
    /// Retry and backoff
    pub retry: FileRetryConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.provider.parse_model().1);
        issues.extend(self.conversation.to_window().1);
        issues.extend(self.conversation.parse_default_role().1);
        issues.extend(self.conversation.exchange_wait().1);
        issues.extend(self.retry.to_retry_policy().1);
        issues
    }

    /// Build the orchestrator parameters, substituting defaults for invalid
    /// values. Call [`validate`](Self::validate) to learn what was replaced.
    pub fn to_chat_params(&self) -> ChatParams {
        ChatParams::default()
            .with_window(self.conversation.to_window().0)
            .with_default_role(self.conversation.parse_default_role().0)
            .with_retry(self.retry.to_retry_policy().0)
            .with_call_timeout(self.provider.timeout())
            .with_exchange_wait(self.conversation.exchange_wait().0)
    }
}
