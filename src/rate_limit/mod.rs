//! Backoff scheduling for the rate-limited classification API.
//!
//! The delay starts large and doubles after every failed attempt. It is
//! capped at `max_delay`; attempts are unbounded unless `max_attempts` is
//! set.

use std::time::Duration;

/// Default initial delay. The backend is rate limited, so this is large on purpose.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(30);

/// Default ceiling for the doubled delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// Retry schedule for classification requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry (and before the first attempt, if enabled).
    pub base_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Wait the current delay before every attempt, including the first.
    pub delay_first_attempt: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: None,
            delay_first_attempt: true,
        }
    }
}

impl BackoffPolicy {
    /// Start a fresh schedule for one logical request.
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            attempt: 0,
            failures: 0,
        }
    }
}

/// Calculate the exponential backoff delay for a given (zero-based) retry index.
pub fn backoff_delay(retry: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Mutable state of one retry loop.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
    failures: u32,
}

impl Backoff {
    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Begin the next attempt.
    ///
    /// Returns the delay to wait before sending it, or `None` once the attempt
    /// budget is exhausted.
    pub fn next_attempt(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }
        let wait = match (self.policy.delay_first_attempt, self.failures) {
            (true, n) => backoff_delay(n, self.policy.base_delay, self.policy.max_delay),
            (false, 0) => Duration::ZERO,
            (false, n) => backoff_delay(n - 1, self.policy.base_delay, self.policy.max_delay),
        };
        self.attempt += 1;
        Some(wait)
    }

    /// Record a failed attempt; the next wait doubles up to the ceiling.
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }
}
