//! Retry logic with exponential backoff
//!
//! Quota / rate-limit 에러만 재시도합니다. 그 외 에러는 즉시 반환됩니다.
//! 지연은 `base * 2^attempt` 에 고정 비율 jitter 를 더한 값입니다.

use o11y_foundation::RetrySettings;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,

    /// Maximum number of retry attempts (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Fixed fraction added on top of each backoff step
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_retries: 3,
            jitter_fraction: 0.1,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            base_delay: settings.base_delay(),
            max_retries: settings.max_retries,
            jitter_fraction: settings.jitter_fraction,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(1u32 << attempt.min(31));
        backoff.saturating_add(backoff.mul_f64(self.jitter_fraction))
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClassification {
    /// Quota exhausted: back off and try again
    RateLimited,

    /// Permanent for this call
    NoRetry,
}

/// Trait for errors that can be classified for retry
pub trait RetryableError {
    fn classify(&self) -> RetryClassification;
}

/// Why a retried operation gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Non-retryable error, returned unchanged
    #[error("{0}")]
    Fatal(E),

    /// Still rate limited after every allowed retry
    #[error("max retries exceeded after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// Caller cancelled while waiting between attempts
    #[error("retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Runs an operation under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an async operation, retrying only rate-limit failures
    ///
    /// Waiting between attempts is abandoned as soon as `cancel` fires.
    pub async fn execute_with_backoff<T, E, F, Fut>(
        &self,
        operation_name: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: RetryableError + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            let e = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };

            match e.classify() {
                RetryClassification::NoRetry => {
                    debug!(
                        "{}: non-retryable error on attempt {}: {}",
                        operation_name,
                        attempt + 1,
                        e
                    );
                    return Err(RetryError::Fatal(e));
                }
                RetryClassification::RateLimited => {
                    if attempt >= self.policy.max_retries {
                        warn!(
                            "{}: max retries ({}) exceeded: {}",
                            operation_name, self.policy.max_retries, e
                        );
                        return Err(RetryError::Exhausted {
                            attempts: attempt + 1,
                            last: e,
                        });
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        "{}: quota exceeded on attempt {}, retrying in {:?}: {}",
                        operation_name,
                        attempt + 1,
                        delay,
                        e
                    );

                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            debug!("{}: cancelled during backoff", operation_name);
                            return Err(RetryError::Cancelled { attempts: attempt + 1 });
                        }
                    }
                    attempt += 1;
                }
            }
        }
    }
}
