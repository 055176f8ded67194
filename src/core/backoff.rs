//! Backoff Executor
//!
//! Information Hiding:
//! - Delay schedule hidden behind `BackoffPolicy`
//! - Only `AgentError::RateLimited` is retried; the classification happens
//!   where the HTTP status is first seen, not here

use super::error::AgentError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{sleep, Duration};

/// Retry schedule for rate-limited calls.
///
/// `max_attempts` counts every execution, the first one included, so an
/// operation is retried at most `max_attempts - 1` times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
        }
    }
}

impl BackoffPolicy {
    /// Delay after the failed attempt numbered `attempt` (1-based):
    /// `min(base * 2^attempt, max)`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `operation`, retrying only while it reports `RateLimited`.
///
/// Any other error is returned as-is after the first failure.
pub async fn run_with_backoff<F, Fut, T>(
    policy: &BackoffPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, AgentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() => {
                if attempt >= max_attempts {
                    tracing::warn!(
                        "[Backoff] '{}' still rate limited after {} attempts: {}",
                        operation_name,
                        attempt,
                        err
                    );
                    return Err(AgentError::ExhaustedRetries { attempts: attempt });
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    "[Backoff] '{}' rate limited (attempt {}/{}), retrying in {}ms",
                    operation_name,
                    attempt,
                    max_attempts,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::debug!(
                    "[Backoff] '{}' failed with non-retryable {}",
                    operation_name,
                    err.kind()
                );
                return Err(err);
            }
        }
    }
}
