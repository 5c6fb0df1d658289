//! Broker Gateway Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin broker-gateway
//! ```
//!
//! # Environment Variables
//!
//! - `BROKER_GATEWAY_CONFIG`: path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: log filter (default: the configured logging level)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;

use broker_gateway::application::services::{
    ConnectionService, OrderService, ReconciliationScheduler,
};
use broker_gateway::config::load_config;
use broker_gateway::infrastructure::broker::{BrokerRegistry, VendorHttpClient};
use broker_gateway::infrastructure::http::{AppState, create_router};
use broker_gateway::infrastructure::oauth::OAuthFlow;
use broker_gateway::infrastructure::persistence::{InMemoryConnectionStore, InMemoryOrderStore};
use broker_gateway::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("BROKER_GATEWAY_CONFIG").ok();
    let config = load_config(config_path.as_deref()).context("loading configuration")?;

    init_tracing(&config.logging.level);
    tracing::info!("starting broker gateway");

    let http = VendorHttpClient::new(Duration::from_secs(
        config.reconciliation.request_timeout_secs,
    ))
    .map_err(|e| anyhow::anyhow!("building vendor HTTP client: {e}"))?;

    let registry = Arc::new(BrokerRegistry::new(config.brokers.clone(), http.clone()));
    let connections = Arc::new(InMemoryConnectionStore::new());
    let orders = Arc::new(InMemoryOrderStore::new());

    let scheduler = ReconciliationScheduler::new(
        config.reconciliation.clone(),
        orders.clone(),
        connections.clone(),
        registry.clone(),
    );

    // Reconciliation bookkeeping is in-memory; pick open orders back up
    // before accepting traffic so a restart cannot orphan them.
    if config.recovery.enabled {
        let recovered = scheduler
            .recover()
            .await
            .map_err(|e| anyhow::anyhow!("recovery sweep failed: {e}"))?;
        tracing::info!(recovered, "startup recovery sweep complete");
    }

    let state = AppState {
        connections: Arc::new(ConnectionService::new(registry.clone(), connections.clone())),
        orders: Arc::new(OrderService::new(
            registry,
            connections,
            orders,
            scheduler.clone(),
        )),
        oauth: Arc::new(OAuthFlow::new(config.brokers.clone(), http)),
        frontend_url: config.server.frontend_url.clone(),
    };

    let router = create_router(state);
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    scheduler.shutdown();
    tracing::info!("broker gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
