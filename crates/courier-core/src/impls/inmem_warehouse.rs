//! In-memory warehouse: append-only record sink for development and tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::DeliveryRecord;
use crate::ports::{Warehouse, WarehouseError};

/// Append-only `Vec` behind a mutex. One row per attempt, never mutated.
#[derive(Default)]
pub struct InMemoryWarehouse {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl InMemoryWarehouse {
    /// Copy of everything recorded so far, in write order.
    pub fn snapshot(&self) -> Vec<DeliveryRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn record(&self, record: DeliveryRecord) -> Result<(), WarehouseError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}
