// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{routing::{delete, get}, Router};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::noise::RngNoise;
use crate::application::pipeline::TelemetryPipeline;
use crate::application::pipeline_service::PipelineService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::realtime_db::RealtimeDbChannel;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{dismiss_alert, get_history, get_state, health_check};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;

    // Create channel (infrastructure layer)
    let channel = Arc::new(RealtimeDbChannel::new(&config.store));

    // Create pipeline and its owning service (application layer)
    let noise = Box::new(RngNoise::from_config(config.pipeline.noise_seed));
    let pipeline = TelemetryPipeline::new(&config.pipeline, noise, Utc::now());
    let (service, handle) = PipelineService::new(pipeline, channel, &config.pipeline);

    let cancel = CancellationToken::new();
    let service_task = tokio::spawn(service.run(cancel.clone()));

    // Create application state
    let state = Arc::new(AppState { pipeline: handle });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/state", get(get_state))
        .route("/history", get(get_history))
        .route("/alerts/:id", delete(dismiss_alert))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.listen_addr))?;
    tracing::info!(%addr, "Starting power-choke-telemetry service");

    let shutdown = cancel.clone();
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C, shutting down");
            shutdown.cancel();
        })
        .await?;

    // The server may also stop on its own; make sure the pipeline follows.
    cancel.cancel();
    service_task.await.context("Pipeline task panicked")??;

    Ok(())
}
