//! Retry and backoff for page fetches.
//!
//! The schedule is a small state machine ([`RetryState`]) so it can be tested
//! without real timing. [`retry_with_backoff`] drives it with `tokio::time::sleep`.

use crate::error::{FetchError, FetchErrorKind};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff parameters for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Extra factor applied when the site signals rate limiting
    pub rate_limit_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            rate_limit_multiplier: 4,
        }
    }
}

impl RetryPolicy {
    /// Returns a copy with a different attempt budget (at least 1).
    pub fn with_budget(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before retry number `retry` (1-based) after a failure of `kind`.
    pub fn delay_for(&self, retry: u32, kind: FetchErrorKind) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let mut delay = self.base_delay.saturating_mul(1u32 << exponent);
        if kind == FetchErrorKind::RateLimited {
            delay = delay.saturating_mul(self.rate_limit_multiplier.max(1));
        }
        delay.min(self.max_delay)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then try again.
    RetryAfter(Duration),
    /// Stop and surface the error.
    GiveUp,
}

/// Attempt counter for one fetch.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a failed attempt and decides the next transition.
    pub fn on_failure(&mut self, kind: FetchErrorKind) -> RetryDecision {
        self.attempts += 1;

        if kind == FetchErrorKind::Permanent || self.attempts >= self.policy.max_attempts {
            return RetryDecision::GiveUp;
        }

        RetryDecision::RetryAfter(self.policy.delay_for(self.attempts, kind))
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the budget runs out.
///
/// The last error is returned unchanged, so an exhausted rate-limit budget
/// surfaces as `RateLimited` and an exhausted transient budget as `Transient`.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut state = RetryState::new(policy);

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match state.on_failure(err.kind) {
            RetryDecision::GiveUp => return Err(err),
            RetryDecision::RetryAfter(delay) => {
                warn!(
                    attempt = state.attempts(),
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "fetch failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
