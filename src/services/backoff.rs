//! Exponential backoff for calls rejected by a rate-limiting upstream.
//!
//! The policy is a pure function of the attempt number so it can be tested
//! without any network or clock.

use std::time::Duration;

/// Backoff configuration for retrying rate-limited authority calls.
///
/// # Default Values
///
/// - `max_attempts`: 3 (total calls, the first one included)
/// - `base_delay`: 1 second
/// - `max_delay`: 3 seconds
///
/// With the defaults the waits are 1s, 2s, 3s, 3s, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
        }
    }
}

impl BackoffPolicy {
    /// Create a policy. `max_attempts` is raised to 1 so the call is always made once.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Total number of calls allowed, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the `attempt`-th failed call (1-based).
    ///
    /// `delay = base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether another call may be made after `attempt` calls have failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
