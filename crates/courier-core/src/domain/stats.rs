//! Attempt statistics, as reported by the queue per delivery id.

use serde::{Deserialize, Serialize};

/// Where a delivery stands in its retry budget.
///
/// Queried fresh from the `TaskQueue` port at each redelivery — the core
/// never caches these across attempts. The synchronous path uses
/// [`AttemptStats::outside_retry_cycle`], which is always "attempt zero"
/// and therefore always counts as last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStats {
    pub attempts_so_far: u32,
    pub max_attempts: u32,
}

impl AttemptStats {
    pub fn new(attempts_so_far: u32, max_attempts: u32) -> Self {
        Self {
            attempts_so_far,
            max_attempts,
        }
    }

    /// Stats for a send performed outside the retry cycle (the sync path).
    pub fn outside_retry_cycle() -> Self {
        Self::new(0, 0)
    }

    /// Is this the attempt at which the queue's budget runs out?
    pub fn is_last_attempt(&self) -> bool {
        self.attempts_so_far == self.max_attempts
    }
}
