//! Default LastDelivery hook: log the terminal outcome and nothing else.

use async_trait::async_trait;
use tracing::info;

use crate::domain::{DeliveryRequest, DeliveryResponse};
use crate::ports::{LastDelivery, SendError};

/// Logs the final outcome of a delivery. Deployments that want to notify
/// someone (callback, dead-letter topic, ...) swap in their own port
/// implementation.
pub struct LogLastDelivery;

#[async_trait]
impl LastDelivery for LogLastDelivery {
    async fn on_last_delivery(
        &self,
        request: &DeliveryRequest,
        response: Option<&DeliveryResponse>,
        error: Option<&SendError>,
    ) {
        match (response, error) {
            (Some(response), _) => {
                info!(delivery = %request, status = response.status, "last delivery");
            }
            (None, Some(error)) => {
                info!(delivery = %request, %error, "last delivery failed");
            }
            (None, None) => {
                // Contract says exactly one side is populated; tolerate anyway.
                info!(delivery = %request, "last delivery (no outcome attached)");
            }
        }
    }
}
