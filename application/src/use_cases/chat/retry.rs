//! Retry-on-transient for completion calls.
//!
//! Permanent failures return immediately. Transient failures are retried
//! with the policy's exponential backoff until the attempt limit is reached.

use crate::config::RetryPolicy;
use crate::ports::completion_client::CompletionError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RetryFailure {
    Permanent(CompletionError),
    Exhausted { attempts: u32, last: CompletionError },
}

/// Decide what to do after attempt number `attempt` (1-based) failed.
///
/// `Ok(delay)` means wait `delay` and try again.
pub(crate) fn next_delay(
    policy: &RetryPolicy,
    attempt: u32,
    error: CompletionError,
) -> Result<Duration, RetryFailure> {
    if !error.is_transient() {
        return Err(RetryFailure::Permanent(error));
    }
    if attempt >= policy.attempts() {
        return Err(RetryFailure::Exhausted {
            attempts: attempt,
            last: error,
        });
    }
    let delay = policy.backoff_delay(attempt);
    warn!(
        "Transient completion failure (attempt {}/{}), retrying in {:?}: {}",
        attempt,
        policy.attempts(),
        delay,
        error
    );
    Ok(delay)
}

/// Run `op` until it succeeds or [`next_delay`] gives up.
pub(crate) async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CompletionError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let delay = next_delay(policy, attempt, error)?;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::immediate(3), || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(CompletionError::Timeout),
                _ => Ok("ok"),
            }
        })
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&RetryPolicy::immediate(5), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CompletionError::Authentication("bad key".into()))
        })
        .await;

        assert_eq!(
            result,
            Err(RetryFailure::Permanent(CompletionError::Authentication(
                "bad key".into()
            )))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_carries_last_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&RetryPolicy::immediate(2), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(CompletionError::Network(format!("reset {n}")))
        })
        .await;

        assert_eq!(
            result,
            Err(RetryFailure::Exhausted {
                attempts: 2,
                last: CompletionError::Network("reset 1".into()),
            })
        );
    }

    #[test]
    fn test_next_delay_uses_backoff() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(15));

        assert_eq!(
            next_delay(&policy, 1, CompletionError::Timeout),
            Ok(Duration::from_millis(10))
        );
        assert_eq!(
            next_delay(&policy, 2, CompletionError::Timeout),
            Ok(Duration::from_millis(15))
        );
        assert!(matches!(
            next_delay(&policy, 3, CompletionError::Timeout),
            Err(RetryFailure::Exhausted { attempts: 3, .. })
        ));
    }
}
