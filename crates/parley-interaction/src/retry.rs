//! Retry policy for completion calls.
//!
//! Attempts run strictly one after another. After a failed attempt `n`
//! (counting from 0) the policy waits `2^n` backoff units before the next
//! one; there is no wait after the last attempt.

use async_trait::async_trait;
use parley_core::completion::{CompletionService, ServiceError};
use parley_core::config::AssistantConfig;
use parley_core::conversation::ConversationTurn;
use std::time::Duration;

/// Wraps a [`CompletionService`] with per-attempt timeouts and exponential backoff.
pub struct RetryingCompletion<S> {
    inner: S,
    max_attempts: u32,
    backoff_unit: Duration,
    attempt_timeout: Duration,
}

impl<S: CompletionService> RetryingCompletion<S> {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new(inner: S) -> Self {
        Self {
            inner,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            backoff_unit: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(inner: S, config: &AssistantConfig) -> Self {
        Self::new(inner)
            .with_max_attempts(config.max_retries)
            .with_backoff_unit(config.backoff_unit())
            .with_attempt_timeout(config.request_timeout())
    }

    /// Total attempts including the first; clamped to at least one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Delay after failed attempt `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(1u32 << attempt.min(20))
    }

    async fn attempt_once(&self, turns: &[ConversationTurn]) -> Result<String, ServiceError> {
        let text = tokio::time::timeout(self.attempt_timeout, self.inner.complete(turns))
            .await
            .map_err(|_| ServiceError::Timeout(self.attempt_timeout))??;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl<S: CompletionService> CompletionService for RetryingCompletion<S> {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, ServiceError> {
        let mut last_error = ServiceError::EmptyResponse;

        for attempt in 0..self.max_attempts {
            match self.attempt_once(turns).await {
                Ok(text) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "Completion succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(err) => {
                    let is_last = attempt + 1 == self.max_attempts;
                    if is_last {
                        tracing::error!(attempt = attempt + 1, error = %err, "Completion attempt failed, giving up");
                    } else {
                        let delay = self.backoff_delay(attempt);
                        tracing::warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Completion attempt failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = err;
                }
            }
        }

        Err(ServiceError::Exhausted {
            attempts: self.max_attempts,
            last: Box::new(last_error),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    /// Fails the first `failures` calls, then answers.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        answer: &'static str,
    }

    #[async_trait]
    impl CompletionService for Flaky {
        async fn complete(&self, _turns: &[ConversationTurn]) -> Result<String, ServiceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ServiceError::Transport {
                    message: "connection reset".into(),
                    is_retryable: true,
                })
            } else {
                Ok(self.answer.to_string())
            }
        }
    }

    /// Always fails and records when each attempt started.
    #[derive(Default)]
    struct AlwaysFails {
        started: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl CompletionService for AlwaysFails {
        async fn complete(&self, _turns: &[ConversationTurn]) -> Result<String, ServiceError> {
            self.started.lock().unwrap().push(Instant::now());
            Err(ServiceError::Status {
                status: 500,
                message: "boom".into(),
                is_retryable: true,
            })
        }
    }

    struct Hangs;

    #[async_trait]
    impl CompletionService for Hangs {
        async fn complete(&self, _turns: &[ConversationTurn]) -> Result<String, ServiceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    fn turns() -> Vec<ConversationTurn> {
        vec![ConversationTurn::user("hello")]
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryingCompletion::new(Hangs).with_backoff_unit(Duration::from_millis(100));
        assert_eq!(retry.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_is_trimmed() {
        let retry = RetryingCompletion::new(Flaky {
            failures: 0,
            calls: AtomicU32::new(0),
            answer: "  hi there  ",
        });
        assert_eq!(retry.complete(&turns()).await.unwrap(), "hi there");
        assert_eq!(retry.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let retry = RetryingCompletion::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
            answer: "ok",
        })
        .with_backoff_unit(Duration::from_millis(1));

        assert_eq!(retry.complete(&turns()).await.unwrap(), "ok");
        assert_eq!(retry.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_exactly_max_attempts_with_growing_delays() {
        let unit = Duration::from_millis(20);
        let retry = RetryingCompletion::new(AlwaysFails::default())
            .with_max_attempts(3)
            .with_backoff_unit(unit);

        let err = retry.complete(&turns()).await.unwrap_err();
        match err {
            ServiceError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ServiceError::Status { status: 500, .. }));
            }
            other => panic!("Expected Exhausted, got {other:?}"),
        }

        let started = retry.inner().started.lock().unwrap().clone();
        assert_eq!(started.len(), 3);
        let first_gap = started[1] - started[0];
        let second_gap = started[2] - started[1];
        assert!(first_gap >= unit);
        assert!(second_gap >= unit * 2);
        assert!(second_gap >= first_gap);
    }

    #[tokio::test]
    async fn test_blank_reply_counts_as_failure() {
        let retry = RetryingCompletion::new(Flaky {
            failures: 0,
            calls: AtomicU32::new(0),
            answer: " \n ",
        })
        .with_max_attempts(2)
        .with_backoff_unit(Duration::from_millis(1));

        let err = retry.complete(&turns()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Exhausted { attempts: 2, .. }));
        assert_eq!(retry.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let retry = RetryingCompletion::new(Hangs)
            .with_max_attempts(2)
            .with_backoff_unit(Duration::from_millis(1))
            .with_attempt_timeout(Duration::from_millis(20));

        let err = retry.complete(&turns()).await.unwrap_err();
        match err {
            ServiceError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, ServiceError::Timeout(_)));
            }
            other => panic!("Expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let retry = RetryingCompletion::new(Hangs).with_max_attempts(0);
        assert_eq!(retry.max_attempts, 1);
    }
}
