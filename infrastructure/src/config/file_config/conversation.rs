//! Conversation window configuration from TOML (`[conversation]` section)

use persona_domain::{ConfigIssue, ConfigIssueCode, ContextWindow, DEFAULT_ROLE_ID, TruncateMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_EXCHANGE_WAIT_SECS: u64 = 120;

/// # Example
///
/// ```toml
/// [conversation]
/// max_turns = 10
/// truncate_mode = "sliding"   # or "clear"
/// default_role = "default"
/// exchange_wait_secs = 120    # wait for the same user's previous message
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConversationConfig {
    /// Exchanges kept per session.
    pub max_turns: usize,
    pub truncate_mode: String,
    /// Role for new and cleared sessions.
    pub default_role: String,
    /// How long a message waits for the same user's previous exchange.
    pub exchange_wait_secs: u64,
}

impl Default for FileConversationConfig {
    fn default() -> Self {
        let window = ContextWindow::default();
        Self {
            max_turns: window.max_turns(),
            truncate_mode: window.mode().to_string(),
            default_role: DEFAULT_ROLE_ID.to_string(),
            exchange_wait_secs: DEFAULT_EXCHANGE_WAIT_SECS,
        }
    }
}

impl FileConversationConfig {
    /// Convert to a domain `ContextWindow`, returning validation issues.
    ///
    /// Each invalid field falls back to its default independently.
    pub fn to_window(&self) -> (ContextWindow, Vec<ConfigIssue>) {
        let defaults = ContextWindow::default();
        let mut issues = Vec::new();

        let mode = match self.truncate_mode.parse::<TruncateMode>() {
            Ok(mode) => mode,
            Err(_) => {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "conversation.truncate_mode".to_string(),
                        value: self.truncate_mode.clone(),
                        valid_values: vec!["sliding".to_string(), "clear".to_string()],
                    },
                    format!(
                        "conversation.truncate_mode: unknown value '{}', falling back to '{}'",
                        self.truncate_mode,
                        defaults.mode()
                    ),
                ));
                defaults.mode()
            }
        };

        let window = match ContextWindow::try_new(self.max_turns, mode) {
            Ok(window) => window,
            Err(e) => {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidConstraint {
                        field: "conversation.max_turns".to_string(),
                    },
                    format!(
                        "conversation.max_turns: {}, falling back to {}",
                        e,
                        defaults.max_turns()
                    ),
                ));
                defaults.with_mode(mode)
            }
        };

        (window, issues)
    }

    /// Default role id, falling back to `default` when empty.
    pub fn parse_default_role(&self) -> (String, Vec<ConfigIssue>) {
        let role = self.default_role.trim();
        if role.is_empty() {
            let issue = ConfigIssue::warning(
                ConfigIssueCode::EmptyValue {
                    field: "conversation.default_role".to_string(),
                },
                format!("conversation.default_role is empty, falling back to '{DEFAULT_ROLE_ID}'"),
            );
            return (DEFAULT_ROLE_ID.to_string(), vec![issue]);
        }
        (role.to_string(), vec![])
    }

    /// Exchange wait, falling back to the default when zero.
    pub fn exchange_wait(&self) -> (Duration, Vec<ConfigIssue>) {
        if self.exchange_wait_secs == 0 {
            let issue = ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "conversation.exchange_wait_secs".to_string(),
                },
                format!(
                    "conversation.exchange_wait_secs must be at least 1, falling back to {DEFAULT_EXCHANGE_WAIT_SECS}"
                ),
            );
            return (Duration::from_secs(DEFAULT_EXCHANGE_WAIT_SECS), vec![issue]);
        }
        (Duration::from_secs(self.exchange_wait_secs), vec![])
    }
}
