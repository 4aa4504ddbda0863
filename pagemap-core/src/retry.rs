//! Bounded exponential backoff for transient API failures.

use std::{future::Future, time::Duration};

use tracing::warn;

use crate::error::PageStoreResult;

/// Retry policy applied by the session to every API call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// A policy that performs each call exactly once.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The delay before the given retry, doubling per attempt up to the cap.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Runs an operation under the policy, retrying transient failures only.
///
/// Permanent, auth, validation, schema and decode failures surface
/// immediately. A transient failure on the final attempt is returned as-is.
pub(crate) async fn with_retries<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> PageStoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PageStoreResult<T>>,
{
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(attempt, status = ?err.status(), delay_ms = delay.as_millis() as u64, "retrying transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::PageStoreError;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_the_limit() {
        let calls = AtomicU32::new(0);

        let result: PageStoreResult<()> = with_retries(&quick_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(PageStoreError::Transient {
                    status: Some(429),
                    message: "rate limited".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: PageStoreResult<()> = with_retries(&quick_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(PageStoreError::Permanent {
                    status: Some(404),
                    message: "not found".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_a_transient_failure() {
        let calls = AtomicU32::new(0);

        let result = with_retries(&quick_policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(PageStoreError::Transient { status: Some(503), message: "busy".to_string() })
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));

        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(4), Duration::from_millis(350));
    }
}
