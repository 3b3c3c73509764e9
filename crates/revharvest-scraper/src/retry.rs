//! Retry-with-backoff shared by every transport adapter.
//!
//! Transient failures (network errors, 429, 5xx) are repeated up to the
//! configured attempt budget. Anything else is returned on the first try.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use revharvest_core::AppConfig;

use crate::error::ScraperError;

/// Attempt budget and backoff base for outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Base delay for the backoff schedule, in milliseconds.
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_base_ms,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_attempts, config.retry_backoff_base_ms)
    }

    /// A single attempt with no waiting. Used by tests.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, 0)
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// The base grows linearly with the retry number, plus up to one extra base
    /// of random jitter: with a 5 s base the first retry waits 5-10 s, the
    /// second 10-15 s.
    fn delay_for(&self, retry: u32) -> Duration {
        if self.backoff_base_ms == 0 {
            return Duration::ZERO;
        }
        let floor = self.backoff_base_ms.saturating_mul(u64::from(retry));
        let jitter = rand::rng().random_range(0..=self.backoff_base_ms);
        Duration::from_millis(floor.saturating_add(jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 5_000)
    }
}

/// Executes `operation`, retrying transient errors according to `policy`.
///
/// Non-retriable errors are returned immediately. When the attempt budget is
/// exhausted the last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retriable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient request failure, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
