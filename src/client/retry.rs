/// Bounded retry with exponential backoff for upstream requests

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::core::error::FetchError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of random delay added to each backoff, as a fraction of it
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(1000),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): base * 2^(attempt-1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        if self.jitter <= 0.0 || backoff.is_zero() {
            return backoff;
        }
        let max_extra = backoff.as_secs_f64() * self.jitter;
        let extra = rand::thread_rng().gen_range(0.0..=max_extra);
        backoff + Duration::from_secs_f64(extra)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the attempt
/// cap is hit. Only errors that report [`FetchError::is_retryable`] are
/// retried.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(label, attempt = attempts, max_attempts, "Sending upstream request");

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempts >= max_attempts => {
                warn!(label, attempts, error = %e, "Giving up on upstream request");
                return Err(FetchError::RetriesExhausted {
                    attempts,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempts);
                warn!(
                    label,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Upstream request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
