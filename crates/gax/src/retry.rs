//! Exponential back-off with jitter, and the retry loop shared by every
//! transport.
//!
//! The loop never starts an attempt past the call's deadline and never
//! sleeps across it: when the next back-off would overshoot the remaining
//! budget the last error is surfaced instead.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::call::Deadline;
use crate::errors::{ErrorKind, RetryDecision, RpcError};

/// Parameters for re-issuing a failed call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth factor applied after each retry.
    pub multiplier: f64,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
    /// Overall budget for the call, across all attempts, when the caller
    /// did not supply a timeout.
    pub total_timeout: Option<Duration>,
    /// Error kinds this policy retries. Kinds that are not transient are
    /// ignored even if listed.
    pub retryable: Vec<ErrorKind>,
    /// Apply full jitter to each delay.
    pub jitter: bool,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            total_timeout: None,
            retryable: Vec::new(),
            jitter: false,
        }
    }

    /// The default policy for idempotent RPCs: retries every transient kind.
    pub fn transient() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            multiplier: 1.3,
            max_delay: Duration::from_secs(60),
            total_timeout: Some(Duration::from_secs(600)),
            retryable: vec![
                ErrorKind::DeadlineExceeded,
                ErrorKind::Unavailable,
                ErrorKind::Aborted,
            ],
            jitter: true,
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_total_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.total_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retryable(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether `err` should be retried under this policy.
    pub fn should_retry(&self, err: &RpcError) -> bool {
        matches!(err.retry_decision(), RetryDecision::Retryable { .. })
            && self.retryable.contains(&err.kind)
    }

    /// A fresh back-off schedule.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_delay,
            multiplier: self.multiplier.max(1.0),
            max: self.max_delay,
            jitter: self.jitter,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Exponential back-off schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    multiplier: f64,
    max: Duration,
    jitter: bool,
}

impl Backoff {
    /// Returns the next delay and advances the schedule.
    ///
    /// With jitter the delay is drawn uniformly from `[0, current]`.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next.min(self.max);
        self.next = self.next.mul_f64(self.multiplier).min(self.max);
        if self.jitter && !current.is_zero() {
            Duration::from_secs_f64(rand::random_range(0.0..=current.as_secs_f64()))
        } else {
            current
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// the deadline leaves no room for another attempt.
///
/// Every attempt receives the same absolute `deadline`; its own budget is
/// whatever remains. The returned error carries the number of attempts made.
pub async fn retry_call<T, F, Fut>(
    policy: &RetryPolicy,
    deadline: Deadline,
    rpc: &str,
    mut attempt: F,
) -> Result<T, RpcError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut backoff = policy.backoff();
    let mut attempts = 0u32;

    loop {
        if deadline.is_expired() {
            return Err(RpcError::deadline_exceeded(format!(
                "deadline exceeded before attempt {} of {rpc}",
                attempts + 1
            ))
            .with_attempts(attempts));
        }

        attempts += 1;
        let outcome = tokio::time::timeout(deadline.remaining(), attempt(attempts)).await;
        let err = match outcome {
            Ok(Ok(value)) => {
                if attempts > 1 {
                    debug!(rpc, attempts, "call succeeded after retry");
                }
                return Ok(value);
            }
            Ok(Err(err)) => err,
            Err(_) => RpcError::deadline_exceeded(format!("deadline exceeded during {rpc}")),
        }
        .with_attempts(attempts);

        if !policy.should_retry(&err) {
            return Err(err);
        }

        let mut delay = backoff.next_delay();
        if let Some(after) = err.retry_after {
            delay = delay.max(after);
        }
        if delay >= deadline.remaining() {
            debug!(rpc, attempts, "no budget left for another attempt");
            return Err(err);
        }

        warn!(
            rpc,
            attempts,
            kind = %err.kind,
            delay_ms = delay.as_millis() as u64,
            "transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
