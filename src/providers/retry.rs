//! Uniform retry policy for provider calls.
//!
//! Every backend gets the same treatment: up to three attempts per call with
//! a doubling delay between them (1s, then 2s). The policy lives in one
//! decorator over [`ChatProvider`] rather than inside each client, so adding
//! a backend never means re-implementing the schedule.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{ChatProvider, ProviderError};

/// Retry schedule for a provider call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles after each failed attempt.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// Decorator that applies a [`RetryPolicy`] to an inner provider.
///
/// Any [`ProviderError`] from the inner call is considered transient; after
/// the final attempt the last error is returned unchanged.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<P: ChatProvider> ChatProvider for RetryingProvider<P> {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, ProviderError> {
        let mut delay = self.policy.initial_delay;
        let mut attempt = 1u32;

        loop {
            match self.inner.complete(system_prompt, user_message).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!(
                            provider = self.inner.id(),
                            attempt, "Provider call succeeded after retry"
                        );
                    }
                    return Ok(text);
                }
                Err(err) if attempt >= self.policy.max_attempts => {
                    warn!(
                        provider = self.inner.id(),
                        attempts = attempt,
                        error = %err,
                        "Provider call failed, attempts exhausted"
                    );
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        provider = self.inner.id(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    fn id(&self) -> &str {
        self.inner.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Stub that fails the first `fail_first` calls, then succeeds.
    struct FlakyProvider {
        calls: AtomicUsize,
        call_times: Mutex<Vec<Instant>>,
        fail_first: usize,
    }

    impl FlakyProvider {
        fn new(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                call_times: Mutex::new(Vec::new()),
                fail_first,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for FlakyProvider {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(Instant::now());
            if n < self.fail_first {
                Err(ProviderError::Request(format!("transient failure {n}")))
            } else {
                Ok("摘要".to_string())
            }
        }

        fn id(&self) -> &str {
            "stub"
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_makes_one_call() {
        let provider = RetryingProvider::new(FlakyProvider::new(0), fast_policy());

        let text = provider.complete("sys", "msg").await.unwrap();

        assert_eq!(text, "摘要");
        assert_eq!(provider.inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let provider = RetryingProvider::new(FlakyProvider::new(2), fast_policy());

        let text = provider.complete("sys", "msg").await.unwrap();

        assert_eq!(text, "摘要");
        assert_eq!(provider.inner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_after_attempts_exhausted() {
        let provider = RetryingProvider::new(FlakyProvider::new(10), fast_policy());

        let err = provider.complete("sys", "msg").await.unwrap_err();

        assert_eq!(provider.inner.call_count(), 3);
        // the error from attempt 3 (zero-based call 2) comes back unchanged
        assert!(err.to_string().contains("transient failure 2"));
    }

    #[tokio::test]
    async fn test_delay_doubles_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(40),
        };
        let provider = RetryingProvider::new(FlakyProvider::new(10), policy);

        provider.complete("sys", "msg").await.unwrap_err();

        let times = provider.inner.call_times.lock().unwrap();
        assert_eq!(times.len(), 3);
        let first_gap = times[1] - times[0];
        let second_gap = times[2] - times[1];
        assert!(first_gap >= Duration::from_millis(40));
        assert!(second_gap >= Duration::from_millis(80));
        // sanity bound so a runaway schedule fails the test
        assert!(second_gap < Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_decorator_reports_inner_id() {
        let provider = RetryingProvider::new(FlakyProvider::new(0), fast_policy());
        assert_eq!(provider.id(), "stub");
    }
}
