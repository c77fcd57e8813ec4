//! LastDelivery port: terminal-outcome hook.

use async_trait::async_trait;

use crate::domain::{DeliveryRequest, DeliveryResponse};
use crate::ports::SendError;

/// Invoked exactly once per delivery, on the attempt determined to be the
/// final one — a successful delivery, or the last budgeted attempt of a
/// failing one. Exactly one of `response` / `error` is populated, never
/// both.
///
/// Like the warehouse, this is a best-effort side effect; it runs after
/// the outcome record and never influences the status reported upstream.
#[async_trait]
pub trait LastDelivery: Send + Sync {
    async fn on_last_delivery(
        &self,
        request: &DeliveryRequest,
        response: Option<&DeliveryResponse>,
        error: Option<&SendError>,
    );
}
