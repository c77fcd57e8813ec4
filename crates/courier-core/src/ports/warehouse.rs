//! Warehouse port: append-only audit sink for attempt outcomes.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::DeliveryRecord;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse write failed: {0}")]
    WriteFailed(String),
}

/// Append-only outcome recorder.
///
/// Writes are best-effort side effects: callers log a failure and move on.
/// A warehouse outage must never prevent a status from being returned to
/// the original caller or to the queue's webhook machinery.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn record(&self, record: DeliveryRecord) -> Result<(), WarehouseError>;
}
