//! HazardHub -- multi-source hazard event aggregation.
//!
//! This crate fetches live hazard events (USGS earthquakes, NWS and UK
//! Environment Agency flood alerts), normalizes them into one severity-scored
//! schema, and serves the merged, filtered, ranked collection over HTTP.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod geo;
pub mod model;
pub mod severity;
pub mod sources;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::aggregate::Aggregator;
use crate::api::state::AppState;
use crate::config::Config;

/// Start the HazardHub daemon: upstream aggregator plus HTTP API server.
pub async fn serve(config: Config) -> Result<()> {
    let aggregator =
        Aggregator::new(&config.upstream).context("failed to build the upstream HTTP client")?;
    let state = AppState {
        aggregator: Arc::new(aggregator),
    };

    let app = api::router(state)
        .layer(api::cors_layer(&config.server.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;

    tracing::info!(%addr, "hazardhub listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
