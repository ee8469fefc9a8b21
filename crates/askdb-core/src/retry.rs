//! Bounded exponential backoff for the external service boundaries.
//!
//! Applied to build-time embedding batches and language-model calls.
//! Query-time embedding calls are deliberately not run through this: their
//! failure propagates straight to the caller.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Retry schedule: up to `max_retries` retries after the first attempt,
/// sleeping `base_delay * multiplier^attempt` (capped at `max_delay`)
/// between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt; the first failure is surfaced.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before the retry that follows `attempt` failures (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis(delay.min(self.max_delay.as_millis() as f64) as u64)
    }
}

/// Run `operation` until it succeeds or the policy is exhausted, returning
/// the last error.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{what} failed (attempt {}/{}): {e}, retrying in {delay:?}",
                    attempt + 1,
                    policy.max_retries + 1
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
