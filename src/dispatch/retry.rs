use crate::error::QueryError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bounded retry with exponential backoff.
///
/// Only errors for which [`QueryError::is_retryable`] holds are retried.
/// The delay starts at `initial_backoff`, doubles after every failure and
/// never exceeds `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt number `attempt`
    /// (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds, fails permanently, or runs out
    /// of attempts.
    ///
    /// If `cancel` fires while waiting out a backoff, the last error is
    /// returned without another attempt.
    pub async fn run<F, Fut, T>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, QueryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(filename = label, attempt, "Query succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(filename = label, attempt, error = %err, "Query failed permanently");
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!(filename = label, attempt, error = %err, "Query failed, retries exhausted");
                return Err(err);
            }

            let delay = self.backoff(attempt);
            warn!(
                filename = label,
                attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %err,
                "Query failed, will retry after backoff"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    debug!(filename = label, attempt, "Cancelled during backoff");
                    return Err(err);
                }
            }
        }
    }
}
