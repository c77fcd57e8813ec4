//! courier-server: process assembly for the retrying HTTP relay.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use courier_core::forward::Forwarder;
use courier_core::impls::{InMemoryTaskQueue, InMemoryWarehouse, LogLastDelivery};
use courier_core::ports::UlidGenerator;

use crate::config::Config;
use crate::dispatch::HttpDispatch;
use crate::sender::ReqwestSender;
use crate::web::AppState;

mod config;
mod dispatch;
mod sender;
mod web;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let sender = Arc::new(
        ReqwestSender::new(config.send_timeout()).context("building outbound http client")?,
    );
    let dispatch = Arc::new(
        HttpDispatch::new(config.webhook_base_url()).context("building webhook dispatcher")?,
    );
    let queue = Arc::new(InMemoryTaskQueue::new(
        config.max_attempts,
        config.backoff(),
        dispatch,
    ));
    let warehouse = Arc::new(InMemoryWarehouse::default());
    let last_delivery = Arc::new(LogLastDelivery);

    let forwarder = Arc::new(Forwarder::new(sender, queue, warehouse, last_delivery));
    let state = AppState {
        forwarder,
        ids: Arc::new(UlidGenerator),
    };

    let app = web::router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await.context("serving")?;

    Ok(())
}
