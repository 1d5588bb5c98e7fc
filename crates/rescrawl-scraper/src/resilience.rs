//! Bounded retry for UI operations that race the page's rendering.
//!
//! A [`RetryPolicy`] names how many attempts an operation gets, the fixed
//! delay between them, and which [`ErrorKind`]s are worth another try.
//! Anything else propagates on the first failure. An operation that is still
//! failing with a retryable kind on its last attempt comes back wrapped in
//! [`ScraperError::Exhausted`] so callers can see how hard we tried.

use std::future::Future;
use std::time::Duration;

use crate::engine::settle;
use crate::error::{ErrorKind, ScraperError};

/// Kinds that usually mean "the UI was not ready yet".
pub const TRANSIENT_KINDS: &[ErrorKind] = &[ErrorKind::Timeout, ErrorKind::ElementNotFound];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub delay: Duration,
    pub retry_on: &'static [ErrorKind],
}

impl RetryPolicy {
    #[must_use]
    pub fn transient(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            retry_on: TRANSIENT_KINDS,
        }
    }

    fn retries(&self, err: &ScraperError) -> bool {
        self.retry_on.contains(&err.kind())
    }
}

/// Runs `operation` under `policy`, logging each failed attempt.
///
/// # Errors
///
/// Returns the first non-retryable error unchanged, or
/// [`ScraperError::Exhausted`] once every attempt failed with a retryable one.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    with_retry_observed(policy, operation, |attempt, err| {
        tracing::warn!(
            operation = operation_name,
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "attempt failed"
        );
    })
    .await
}

/// Like [`with_retry`], but hands every failed attempt to `observer` instead
/// of the log.
///
/// # Errors
///
/// Same as [`with_retry`].
pub async fn with_retry_observed<T, F, Fut, O>(
    policy: RetryPolicy,
    mut operation: F,
    mut observer: O,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
    O: FnMut(u32, &ScraperError),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                observer(attempt, &err);
                if !policy.retries(&err) {
                    return Err(err);
                }
                if attempt >= max_attempts {
                    return Err(ScraperError::Exhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                settle(policy.delay).await;
            }
        }
    }
}
