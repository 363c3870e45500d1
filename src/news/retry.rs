use anyhow::Result;
use std::future::Future;
use std::time::Duration;

use crate::error::PlaygroundError;

/// Exponential backoff with a cap and a predicate deciding what is worth
/// retrying.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total tries, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
    pub retryable: fn(&anyhow::Error) -> bool,
}

/// Rate-limit and 5xx errors from the news feed.
pub fn is_transient_upstream(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PlaygroundError>()
        .is_some_and(PlaygroundError::is_transient)
}

impl Default for RetryPolicy {
    /// The news feed policy: 3 tries, 2s base delay, x4 backoff, 20s cap.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 4,
            max_delay: Duration::from_secs(20),
            retryable: is_transient_upstream,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("multiplier", &self.multiplier)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Call `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < attempts && (self.retryable)(&e) => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{label} failed ({e}), retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_delays_grow_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(8));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
        assert_eq!(policy.delay_for(30), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = fast_policy()
            .run("category fetch", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(PlaygroundError::RateLimited.into())
                } else {
                    Ok("page")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<()> = fast_policy()
            .run("category fetch", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PlaygroundError::UpstreamServer {
                    status: 502,
                    message: "bad gateway".to_string(),
                }
                .into())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<()> = fast_policy()
            .run("category fetch", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PlaygroundError::Upstream {
                    status: 401,
                    message: "bad key".to_string(),
                }
                .into())
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlaygroundError>(),
            Some(PlaygroundError::Upstream { status: 401, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
