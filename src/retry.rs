//! Bounded exponential backoff for transient failures.
//!
//! Wraps a tool call with a retry loop: transient failures (timeouts,
//! connection resets, retryable provider statuses) are attempted again
//! after an exponentially growing, capped, optionally jittered delay; any
//! other failure propagates immediately. Waits suspend on
//! `tokio::time::sleep`, so dropping the wrapped future cancels both the
//! in-flight attempt and any pending backoff.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::tools::ToolError;

/// Retry policy for wrapped tool calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Ceiling on the computed delay, applied before jitter.
    pub max_delay: Duration,
    /// Multiply each delay by a random factor in [1.0, 1.25).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let base = self.base_delay.as_secs_f64() * f64::from(2u32.saturating_pow(exp).max(1));
        let capped = base.min(self.max_delay.as_secs_f64());

        let delayed = if self.jitter {
            capped * rand::thread_rng().gen_range(1.0..1.25)
        } else {
            capped
        };

        Duration::from_secs_f64(delayed)
    }
}

/// Ephemeral per-call retry bookkeeping.
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    last_error: Option<ToolError>,
}

/// Run `operation` under `policy`.
///
/// Only failures for which [`ToolError::is_transient`] holds are retried;
/// anything else returns on the spot. Once `max_attempts` transient
/// failures have accumulated, the last one is returned wrapped in
/// [`ToolError::RetryExhausted`] with the attempt count.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ToolError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut state = RetryState {
        attempt: 0,
        last_error: None,
    };

    loop {
        state.attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                if state.attempt >= max_attempts {
                    state.last_error = Some(err);
                    break;
                }

                let delay = policy.delay_for_attempt(state.attempt);
                tracing::warn!(
                    attempt = state.attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                state.last_error = Some(err);
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }

    // Loop only breaks with a recorded transient error.
    let source = state
        .last_error
        .unwrap_or_else(|| ToolError::Transient("no attempt recorded".into()));
    Err(ToolError::RetryExhausted {
        attempts: state.attempt,
        source: Box::new(source),
    })
}
