//! Audit record: one row per attempt, append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::DeliveryRequest;
use super::response::DeliveryResponse;
use super::stats::AttemptStats;

/// What happened on one attempt of one delivery.
///
/// Written unconditionally after every send, whatever the outcome. The
/// warehouse never mutates or deletes these; `completed` marks the row
/// after which no further attempts will follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub timestamp: DateTime<Utc>,
    pub request: DeliveryRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<DeliveryResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stats: AttemptStats,
    pub completed: bool,
}

impl DeliveryRecord {
    pub fn new(
        request: DeliveryRequest,
        response: Option<DeliveryResponse>,
        error: Option<String>,
        stats: AttemptStats,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request,
            response,
            error,
            stats,
            completed: stats.is_last_attempt(),
        }
    }
}
