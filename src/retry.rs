use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::RelayerError;
use crate::logging::LogContext;

/// Bounded retry with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause after a failed attempt when more remain
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

/// Final result of a retried operation and how many attempts it took
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, RelayerError>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `operation` until it succeeds, a non-recoverable error occurs, or
    /// the attempt budget is spent. `on_error` sees every failed attempt.
    pub async fn execute<T, F, Fut, H>(&self, operation_name: &str, mut operation: F, mut on_error: H) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RelayerError>>,
        H: FnMut(&RelayerError, u32),
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        LogContext::new("retry", operation_name)
                            .with_retry_count(attempt)
                            .info(&format!("Operation recovered after {} attempts", attempt));
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt };
                }
                Err(error) => error,
            };

            on_error(&error, attempt);

            if !error.is_recoverable() {
                LogContext::new("retry", operation_name)
                    .with_retry_count(attempt)
                    .with_metadata("reason", serde_json::json!("non_recoverable"))
                    .error(&format!("Non-recoverable error, aborting retries: {}", error));
                return RetryOutcome { result: Err(error), attempts: attempt };
            }

            if attempt >= self.max_attempts {
                return RetryOutcome { result: Err(error), attempts: attempt };
            }

            LogContext::new("retry", operation_name)
                .with_retry_count(attempt)
                .with_metadata("delay_ms", serde_json::json!(self.delay.as_millis() as u64))
                .debug(&format!("Retrying (attempt {} of {})", attempt + 1, self.max_attempts));

            sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChainError, SigningError};
    use std::cell::Cell;

    fn transport_error() -> RelayerError {
        RelayerError::Chain(ChainError::Transport("connection refused".to_string()))
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let outcome = policy
            .execute("test_operation", |_| async { Ok::<i32, RelayerError>(42) }, |_, _| {})
            .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let failures = Cell::new(0u32);

        let outcome = policy
            .execute(
                "test_operation",
                |attempt| async move {
                    if attempt <= 2 {
                        Err(transport_error())
                    } else {
                        Ok(attempt)
                    }
                },
                |_, _| failures.set(failures.get() + 1),
            )
            .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.result.unwrap(), 3);
        assert_eq!(failures.get(), 2);
    }

    #[tokio::test]
    async fn test_exhausts_attempt_budget() {
        let policy = RetryPolicy::new(4, Duration::ZERO);

        let outcome = policy
            .execute("test_operation", |_| async { Err::<(), _>(transport_error()) }, |_, _| {})
            .await;

        assert_eq!(outcome.attempts, 4);
        assert!(outcome.result.is_err());
    }

    #[tokio::test]
    async fn test_signer_failure_is_retried() {
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let outcome = policy
            .execute(
                "test_operation",
                |attempt| async move {
                    if attempt == 1 {
                        Err(RelayerError::Signing(SigningError::Signer(alloy::signers::Error::other("signer busy"))))
                    } else {
                        Ok(attempt)
                    }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_non_recoverable_error_stops_immediately() {
        let policy = RetryPolicy::new(4, Duration::ZERO);

        let outcome = policy
            .execute(
                "test_operation",
                |_| async { Err::<(), _>(RelayerError::Signing(SigningError::InvalidKey("bad".to_string()))) },
                |_, _| {},
            )
            .await;

        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.result, Err(RelayerError::Signing(_))));
    }
}
