//! Bounded retry with per-attempt timeout and exponential backoff

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::constants::media;
use crate::errors::{ClientError, ClientResult};

/// Retry settings for remote media lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each one after
    pub base_delay: Duration,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: media::MAX_RETRIES,
            base_delay: Duration::from_millis(media::RETRY_BASE_DELAY_MS),
            attempt_timeout: Duration::from_millis(media::ATTEMPT_TIMEOUT_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (0-based): `base * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Total attempts including the first
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `operation` until it succeeds or attempts run out
    ///
    /// A timed-out attempt counts as a failure. The error from the last
    /// attempt is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout {
                    millis: self.attempt_timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                        label,
                        attempt,
                        self.total_attempts(),
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        "{} failed after {} attempts: {}",
                        label,
                        self.total_attempts(),
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_exponential_backoff_calculation() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.total_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_observed() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();

        let result: ClientResult<()> = policy
            .run("lookup", || async {
                Err(ClientError::Network {
                    message: "down".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        // 500ms + 1000ms between the three attempts
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_failure() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
            attempt_timeout: Duration::from_millis(100),
        };
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: ClientResult<u32> = policy
            .run("slow lookup", move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_last_error() {
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(10),
            attempt_timeout: Duration::from_millis(100),
        };

        let result: ClientResult<()> = policy
            .run("hung lookup", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ClientError::Timeout { millis: 100 })));
    }
}
