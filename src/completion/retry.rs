//! Bounded retry with exponential backoff and jitter

use std::time::Duration;

use rand::Rng;

use crate::completion::{CompletionBackend, CompletionError};

/// Retry schedule for the completion call. Total wait is bounded:
/// at most `max_attempts` tries, each backoff capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt after `attempt` (1-based): base * 2^(n-1),
    /// capped.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(1u64 << exponent);
        Duration::from_millis(millis).min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let cap = self.base_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=cap))
    }
}

/// Send a prompt, retrying transient failures per the policy. Permanent
/// failures propagate immediately; the last transient error surfaces once
/// attempts are exhausted.
pub async fn send_with_retry(
    backend: &dyn CompletionBackend,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, CompletionError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match backend.send(prompt).await {
            Ok(text) => return Ok(text),
            Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt) + policy.jitter();
                tracing::warn!(
                    "transient completion failure on attempt {}: {}; retrying in {:?}",
                    attempt,
                    error,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyBackend {
        calls: AtomicU32,
        failures: u32,
        transient: bool,
    }

    #[async_trait]
    impl CompletionBackend for FlakyBackend {
        async fn send(&self, _prompt: &str) -> Result<String, CompletionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                if self.transient {
                    Err(CompletionError::Transient("overloaded".into()))
                } else {
                    Err(CompletionError::Permanent("bad request".into()))
                }
            } else {
                Ok("{\"answer\":\"ok\"}".to_string())
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let backend = FlakyBackend {
            calls: AtomicU32::new(0),
            failures: 2,
            transient: true,
        };
        let result = send_with_retry(&backend, "p", &fast_policy()).await;
        assert!(result.is_ok());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts_on_persistent_transient_failure() {
        let backend = FlakyBackend {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            transient: true,
        };
        let result = send_with_retry(&backend, "p", &fast_policy()).await;
        assert!(matches!(result, Err(CompletionError::Transient(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let backend = FlakyBackend {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            transient: false,
        };
        let result = send_with_retry(&backend, "p", &fast_policy()).await;
        assert!(matches!(result, Err(CompletionError::Permanent(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500)); // capped
    }
}
