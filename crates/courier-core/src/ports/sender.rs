//! HttpSender port: one outbound HTTP attempt.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{DeliveryRequest, DeliveryResponse};

/// A network-level failure: no response could be obtained at all.
///
/// Status-code errors are NOT a `SendError` — a 4xx/5xx still comes back
/// as a `DeliveryResponse` and is classified by policy.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SendError {
    message: String,
}

impl SendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs exactly one outbound HTTP attempt for a delivery.
///
/// Implementations must bound the call with a fixed timeout so a stalled
/// remote host cannot pin the calling task forever.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: &DeliveryRequest) -> Result<DeliveryResponse, SendError>;
}
