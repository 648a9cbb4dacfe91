use crate::config::CrawlerConfig;
use std::future::Future;
use std::time::Duration;

/// Retry parameters shared by page and sitemap fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Backoff before the first retry
    pub base: Duration,
    /// Upper bound for any single backoff
    pub max: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, base: Duration, max: Duration) -> Self {
        Self { retries, base, max }
    }

    /// Page fetch policy from the crawler settings
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.retries,
            Duration::from_millis(config.retry_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }

    /// Same backoff, different retry count
    pub fn with_retries(self, retries: u32) -> Self {
        Self { retries, ..self }
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Sleep after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are exhausted
///
/// `op` receives the 1-based attempt number. The last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts() && is_retryable(&e) => {
                let delay = policy.backoff(attempt);
                tracing::trace!(attempt, ?delay, "Attempt failed, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
