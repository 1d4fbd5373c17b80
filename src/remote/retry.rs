use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;

use crate::error::{AppError, Result};

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay; attempt `n` waits `n × base`.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
/// Upper bound on any single retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

/// Linear-backoff retry policy applied to every backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt `attempt` (1-based),
    /// capped at [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(attempt)
            .map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY))
    }

    /// Delays between attempts: `base`, `2 × base`, ... for `max_retries` retries.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        let policy = *self;
        (1..=policy.max_retries).map(move |n| policy.delay_for(n))
    }

    /// Run `op` until it succeeds or `max_retries` retries have failed.
    ///
    /// Only transport failures are retried; any other error is returned as-is.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        let should_retry = |e: &AppError| {
            let AppError::Transport(msg) = e else {
                return false;
            };
            attempt += 1;
            if attempt > self.max_retries {
                return false;
            }
            tracing::warn!(
                request = label,
                attempt,
                delay_ms = self.delay_for(attempt).as_millis() as u64,
                error = %msg,
                "request failed, retrying"
            );
            true
        };
        RetryIf::spawn(self.strategy(), op, should_retry).await
    }
}
