//! Delivery response and the permanent/transient classification policy.

use serde::{Deserialize, Serialize};

use super::request::Headers;

/// Result of one HTTP attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl DeliveryResponse {
    /// Did the remote host report an error status (>= 400)?
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

impl std::fmt::Display for DeliveryResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP response {}", self.status)
    }
}

/// Classification policy: where does "final" end and "retryable" begin?
///
/// A permanent outcome is any status in `[200, boundary)` — including 4xx
/// client errors and 3xx redirects: the remote host answered conclusively,
/// so retrying the same request would not change anything. Everything else
/// (network failure, >= boundary, sub-200 oddities) is transient and
/// eligible for a further attempt.
///
/// The boundary is policy, not a constant. The default (500) matches the
/// usual "5xx means try again later" reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    boundary: u16,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { boundary: 500 }
    }
}

impl Classifier {
    pub fn with_boundary(boundary: u16) -> Self {
        Self { boundary }
    }

    /// Final outcome: not worth retrying.
    pub fn is_permanent(&self, response: &DeliveryResponse) -> bool {
        response.status >= 200 && response.status < self.boundary
    }

    /// Retryable outcome, subject to the queue's limits.
    pub fn is_transient(&self, response: &DeliveryResponse) -> bool {
        !self.is_permanent(response)
    }
}
