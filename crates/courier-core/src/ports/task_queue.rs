//! TaskQueue port: the durable, deduplicating retry scheduler.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AttemptStats, DeliveryId};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}

/// What gets handed to the queue: the delivery id (dedup key), the webhook
/// path the queue should POST to, and the serialized delivery payload.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueTask {
    pub id: DeliveryId,
    pub webhook_path: String,
    pub payload: Vec<u8>,
}

/// Durable task queue, external to the core.
///
/// # Contract
/// - `enqueue` is idempotent by `id`: submitting the same id twice must not
///   create two independent schedules.
/// - Retry timing, backoff and mutual exclusion per id are the queue's
///   responsibility; the core only reports per-attempt success/failure
///   through the webhook status.
/// - `attempt_stats` answers with what the queue knows right now. A queue
///   that cannot answer reports stats that do NOT read as a last attempt
///   (firing terminal handling early is worse than firing it late).
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: QueueTask) -> Result<(), QueueError>;

    async fn attempt_stats(&self, id: &DeliveryId) -> AttemptStats;
}
