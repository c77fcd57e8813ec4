//! HTTP surface: router, shared state, handlers.

pub mod extract;
pub mod relay;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use axum::routing::post;

use courier_core::forward::{Forwarder, WEBHOOK_PATH};
use courier_core::ports::IdGenerator;

#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub ids: Arc<dyn IdGenerator>,
}

/// One fixed route for the queue's callback; everything else falls
/// through to the relay handler (POST/PUT relays, the rest explains).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(webhook::redeliver))
        .fallback(relay::relay)
        .with_state(state)
}
