//! Chat parameters: everything the orchestrator needs from configuration.
//!
//! These values are loaded by an outer collaborator (config files,
//! environment) and handed in; the application layer never reads files.

use persona_domain::{ContextWindow, DEFAULT_ROLE_ID};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behaviour for transient completion failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` and no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Attempt limit, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// `min(base * 2^(attempt-1), max)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    // ==================== Builder Methods ====================

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }
}

/// Parameters for [`ChatOrchestrator`](crate::use_cases::chat::ChatOrchestrator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParams {
    /// How many exchanges each session keeps.
    pub window: ContextWindow,
    /// Role assigned to new and cleared sessions.
    pub default_role: String,
    /// Retry policy for transient completion failures.
    pub retry: RetryPolicy,
    /// Limit for one completion call; for streams, the longest allowed gap
    /// between fragments.
    pub call_timeout: Option<Duration>,
    /// Longest wait for an earlier exchange of the same user to finish.
    pub exchange_wait: Duration,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            window: ContextWindow::default(),
            default_role: DEFAULT_ROLE_ID.to_string(),
            retry: RetryPolicy::default(),
            call_timeout: Some(Duration::from_secs(60)),
            exchange_wait: Duration::from_secs(120),
        }
    }
}

impl ChatParams {
    // ==================== Builder Methods ====================

    pub fn with_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_exchange_wait(mut self, wait: Duration) -> Self {
        self.exchange_wait = wait;
        self
    }
}
