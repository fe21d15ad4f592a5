//! Timeout, cancellation and exponential backoff around a fallible async call.
//!
//! The executor only knows whether an attempt failed transiently or for good;
//! deciding which is which is left to the caller (see `provider::http`).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ForecastError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Retry `n` waits `base_delay * 2^n`.
    pub base_delay: Duration,
    /// Deadline for the whole call, backoff included.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Outcome of a single failed attempt.
#[derive(Debug, Clone)]
pub enum Attempt {
    Transient(String),
    Fatal(ForecastError),
}

/// Emitted once per scheduled retry, before the backoff sleep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    pub retry: u32,
    pub delay: Duration,
    pub cause: String,
}

/// Observer for retries, e.g. for metrics or tests.
pub type RetryHook = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Runs `operation` until it succeeds, fails fatally, runs out of retries,
/// exceeds `policy.timeout` or `cancel` fires.
pub async fn run_with_retry<T, F, Fut, O>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
    mut on_retry: O,
) -> Result<T, ForecastError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Attempt>>,
    O: FnMut(&RetryEvent),
{
    let attempts = async {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        tracing::info!("weather request succeeded after {retry} retries");
                    }
                    return Ok(value);
                }
                Err(Attempt::Fatal(err)) => {
                    tracing::debug!(error = %err, "non-retryable failure");
                    return Err(err);
                }
                Err(Attempt::Transient(cause)) => {
                    if retry >= policy.max_retries {
                        tracing::error!(%cause, "all {} retries exhausted", policy.max_retries);
                        return Err(ForecastError::RequestFailed(cause));
                    }

                    retry += 1;
                    let delay = policy.delay_for_retry(retry);
                    tracing::warn!(
                        %cause,
                        "retry {retry} of {} in {:?}",
                        policy.max_retries,
                        delay
                    );
                    on_retry(&RetryEvent { retry, delay, cause });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("weather request cancelled");
            Err(ForecastError::Cancelled)
        }
        res = tokio::time::timeout(policy.timeout, attempts) => {
            res.unwrap_or_else(|_| Err(ForecastError::Timeout(policy.timeout)))
        }
    }
}
