//! Bounded Retry Policy
//!
//! Applies only to opening a generation stream. Once the stream is open,
//! nothing here governs chunk delivery.

use std::future::Future;
use std::time::Duration;

use super::types::{LlmError, LlmResult};

/// Default number of attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Upper bound for a single backoff sleep.
pub const DEFAULT_MAX_DELAY_MS: u64 = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
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

    /// Wait before retrying after the zero-based `attempt` failed with `err`.
    ///
    /// A server `Retry-After` hint wins over the computed backoff.
    pub fn delay_for(&self, attempt: u32, err: &LlmError) -> Duration {
        if let Some(secs) = err.retry_after_secs() {
            return Duration::from_secs(secs).min(self.max_delay);
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are exhausted. `operation` receives the zero-based
/// attempt number.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> LlmResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt + 1 >= max_attempts {
                    return Err(err);
                }

                let wait = policy.delay_for(attempt, &err);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "retry_with_backoff: retryable error, backing off"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
