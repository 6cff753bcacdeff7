//! Retry configuration from TOML (`[retry]` section)

use persona_application::RetryPolicy;
use persona_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff for transient completion failures.
///
/// # Example
///
/// ```toml
/// [retry]
/// max_attempts = 3      # total, including the first call
/// base_delay_ms = 1000
/// max_delay_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl FileRetryConfig {
    /// Convert to a `RetryPolicy`, returning validation issues.
    ///
    /// A zero attempt limit becomes the default limit. A base delay above
    /// the cap is clamped to the cap.
    pub fn to_retry_policy(&self) -> (RetryPolicy, Vec<ConfigIssue>) {
        let defaults = RetryPolicy::default();
        let mut issues = Vec::new();

        let max_attempts = if self.max_attempts == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "retry.max_attempts".to_string(),
                },
                format!(
                    "retry.max_attempts must be at least 1, falling back to {}",
                    defaults.max_attempts
                ),
            ));
            defaults.max_attempts
        } else {
            self.max_attempts
        };

        let base_delay_ms = if self.base_delay_ms > self.max_delay_ms {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "retry.base_delay_ms".to_string(),
                },
                format!(
                    "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({}), clamping",
                    self.base_delay_ms, self.max_delay_ms
                ),
            ));
            self.max_delay_ms
        } else {
            self.base_delay_ms
        };

        let policy = RetryPolicy::default()
            .with_max_attempts(max_attempts)
            .with_base_delay(Duration::from_millis(base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms));
        (policy, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default_matches_policy() {
        let (policy, issues) = FileRetryConfig::default().to_retry_policy();
        assert!(issues.is_empty());
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_zero_attempts_falls_back() {
        let config = FileRetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let (policy, issues) = config.to_retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_base_above_cap_is_clamped() {
        let config = FileRetryConfig {
            max_attempts: 5,
            base_delay_ms: 2000,
            max_delay_ms: 500,
        };
        let (policy, issues) = config.to_retry_policy();
        assert_eq!(issues.len(), 1);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 5);
    }
}
