//! Retry settings for backend calls and the loop that applies them.
//!
//! The default is a single attempt with no back-off: a failed call is final
//! for the event, and redelivery belongs to the transport layer.

use std::future::Future;
use std::time::Duration;

use reconciliation::{RetryPolicy, SessionError};
use tokio::time::sleep;

const DEFAULT_MAX_BACKOFF_MS: u64 = 2_000;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every retry.
    Constant(Duration),
    /// `initial`, doubling after each attempt, capped at `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound on any single delay.
        max: Duration,
    },
}

impl Backoff {
    /// Exponential back-off starting at `initial` with the default cap.
    pub fn exponential(initial: Duration) -> Self {
        Self::Exponential {
            initial,
            max: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Constant(delay) => delay,
            Self::Exponential { initial, max } => {
                let exponent = attempt.saturating_sub(1).min(16);
                initial.saturating_mul(1u32 << exponent).min(max)
            }
        }
    }
}

/// How many times a backend call is attempted and how long to wait between
/// attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: Backoff,
}

impl RetrySettings {
    /// One attempt, no back-off.
    pub const fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Constant(Duration::ZERO),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::single_attempt()
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent.
pub(crate) async fn with_retry<T, F, Fut>(
    settings: &RetrySettings,
    label: &'static str,
    mut operation: F,
) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let max_attempts = settings.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                tracing::trace!(operation = label, attempt, "backend call succeeded");
                return Ok(value);
            }
            Err(err) => err,
        };

        let after = match err.retry_policy() {
            RetryPolicy::Retryable { after } if attempt < max_attempts => after,
            RetryPolicy::Retryable { .. } => {
                tracing::debug!(operation = label, attempt, error = %err, "backend call exhausted retries");
                return Err(err);
            }
            RetryPolicy::NonRetryable => return Err(err),
        };

        let backoff = settings
            .backoff
            .delay(attempt)
            .max(after.unwrap_or(Duration::ZERO));
        tracing::warn!(
            operation = label,
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %err,
            "backend call failed; retrying"
        );
        sleep(backoff).await;
    }
}
