use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use super::cancel::CancelFlag;
use crate::error::{CollectError, CollectResult};

/// How one attempt of a unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Success,
    RateLimited,
    Timeout,
    Failed,
}

impl UnitOutcome {
    pub fn of<T>(result: &CollectResult<T>) -> Self {
        match result {
            Ok(_) => UnitOutcome::Success,
            Err(CollectError::RateLimited(_)) => UnitOutcome::RateLimited,
            Err(CollectError::Timeout(_)) => UnitOutcome::Timeout,
            Err(_) => UnitOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Done,
    RetryAfter(Duration),
    GiveUp,
}

/// Retry budget for one unit of work. Rate-limit waits and ordinary
/// failures are counted separately.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Attempts allowed when the unit fails or times out.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Cool-down waits allowed when the source reports a rate limit.
    pub max_rate_limit_waits: u32,
    pub rate_limit_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration, rate_limit_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            max_rate_limit_waits: max_attempts.max(1),
            rate_limit_delay,
        }
    }

    pub fn with_rate_limit_waits(mut self, waits: u32) -> Self {
        self.max_rate_limit_waits = waits;
        self
    }

    /// Record `outcome` in `tracker` and decide what happens next.
    pub fn next(&self, tracker: &mut RetryTracker, outcome: UnitOutcome) -> RetryDecision {
        match outcome {
            UnitOutcome::Success => RetryDecision::Done,
            UnitOutcome::RateLimited => {
                tracker.rate_limits += 1;
                if tracker.rate_limits > self.max_rate_limit_waits {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::RetryAfter(self.rate_limit_delay)
                }
            }
            UnitOutcome::Timeout | UnitOutcome::Failed => {
                tracker.failures += 1;
                if tracker.failures >= self.max_attempts {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::RetryAfter(self.retry_delay)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryTracker {
    pub failures: u32,
    pub rate_limits: u32,
}

impl RetryTracker {
    pub fn attempts(&self) -> u32 {
        self.failures + self.rate_limits + 1
    }
}

/// Why a unit of work produced no value.
#[derive(Debug)]
pub enum UnitFailure {
    Exhausted(CollectError),
    Cancelled,
}

/// Run `work` until it succeeds, the policy gives up, or `cancel` fires.
/// Each attempt is bounded by `timeout`; an elapsed attempt counts as a
/// timeout.
pub async fn run_with_backoff<T, F, Fut>(
    label: &str,
    policy: &BackoffPolicy,
    timeout: Duration,
    cancel: &CancelFlag,
    mut work: F,
) -> Result<T, UnitFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CollectResult<T>>,
{
    let mut tracker = RetryTracker::default();

    loop {
        if cancel.is_cancelled() {
            return Err(UnitFailure::Cancelled);
        }

        info!("▶️  Running {} (attempt {})", label, tracker.attempts());
        let result = match tokio::time::timeout(timeout, work()).await {
            Ok(result) => result,
            Err(_) => Err(CollectError::Timeout(format!(
                "{} exceeded {}s",
                label,
                timeout.as_secs()
            ))),
        };

        let outcome = UnitOutcome::of(&result);
        let err = match result {
            Ok(value) => {
                info!("✅ Completed {}", label);
                return Ok(value);
            }
            Err(e) => e,
        };

        match policy.next(&mut tracker, outcome) {
            RetryDecision::Done => unreachable!("only success finishes a unit"),
            RetryDecision::RetryAfter(delay) => {
                if outcome == UnitOutcome::RateLimited {
                    warn!(
                        "⏳ {} rate limited ({}). Waiting {}s...",
                        label,
                        err,
                        delay.as_secs()
                    );
                } else {
                    error!("❌ Error in {}: {}", label, err);
                    info!("Retrying {} in {}s...", label, delay.as_secs());
                }
                if !cancel.sleep(delay).await {
                    return Err(UnitFailure::Cancelled);
                }
            }
            RetryDecision::GiveUp => {
                error!(
                    "❌ Failed to complete {} after {} attempts: {}",
                    label,
                    tracker.attempts() - 1,
                    err
                );
                return Err(UnitFailure::Exhausted(err));
            }
        }
    }
}
