//! Redelivery webhook: the queue calling back with a serialized delivery.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::AppState;

/// The queue reads nothing but the status: 2xx stops redelivery, anything
/// else feeds its backoff policy. No body.
pub async fn redeliver(State(state): State<AppState>, body: Bytes) -> Response {
    let outcome = state.forwarder.on_redeliver(&body).await;
    StatusCode::from_u16(outcome.webhook_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}
