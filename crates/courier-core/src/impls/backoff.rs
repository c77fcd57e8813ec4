//! Backoff policy: decides redelivery delays for the in-memory queue.

use std::time::Duration;

/// Exponential backoff with a configurable base delay.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first redelivery.
    pub base_delay: Duration,

    /// Multiplier applied per further attempt.
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, multiplier: f64) -> Self {
        Self {
            base_delay,
            multiplier,
        }
    }

    /// Delay before the next redelivery, given the number of attempts
    /// already made (1-indexed): `base_delay * multiplier^(attempts - 1)`.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }
}
