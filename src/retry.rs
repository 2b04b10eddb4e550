//! Retry logic with exponential backoff for network operations.
//!
//! Only image pulls go through here; every other external command is
//! attempted exactly once.

use crate::error::Result;
use log::{error, info, warn};
use std::future::Future;
use std::time::Duration;

/// Bounded retry behavior for a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt (0 = try once)
    pub max_retries: u32,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single wait
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt` (1-based): initial, 2x, 4x, ... capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Retry an async operation with exponential backoff
///
/// Recoverable errors are retried until `policy.max_retries` is exhausted;
/// unrecoverable errors (see [`crate::RunnerError::is_recoverable`]) are
/// returned immediately. On exhaustion the last error is returned.
///
/// # Arguments
/// * `operation` - Async closure that returns Result<T>
/// * `policy` - Retry bounds and backoff
/// * `operation_name` - Human-readable name for logging
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    policy: RetryPolicy,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempts > 0 {
                    info!(
                        "{} succeeded after {} retry(ies)",
                        operation_name, attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_recoverable() {
                    error!("{} failed with unrecoverable error", operation_name);
                    return Err(e);
                }

                if attempts >= policy.max_retries {
                    error!(
                        "{} failed after {} attempt(s)",
                        operation_name,
                        attempts + 1
                    );
                    return Err(e);
                }

                attempts += 1;
                let wait = policy.backoff_for(attempts);

                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:.1}s...",
                    operation_name,
                    attempts,
                    policy.max_retries + 1,
                    e,
                    wait.as_secs_f64()
                );

                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandError, RunnerError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    fn pull_failure() -> RunnerError {
        RunnerError::Acquisition(CommandError::NonZeroExit {
            command: "docker pull img".to_string(),
            code: 1,
        })
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(40), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_with_backoff(
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(pull_failure())
                } else {
                    Ok("pulled")
                }
            },
            instant(3),
            "docker pull img",
        )
        .await;

        assert_eq!(result.ok(), Some("pulled"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = retry_with_backoff(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(pull_failure())
            },
            instant(2),
            "docker pull img",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unrecoverable_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = retry_with_backoff(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RunnerError::Acquisition(CommandError::Launch {
                    command: "docker pull img".to_string(),
                    reason: "No such file or directory".to_string(),
                }))
            },
            instant(5),
            "docker pull img",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
