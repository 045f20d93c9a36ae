// Starter binary entry point

use anyhow::Result;
use common::config::Settings;
use common::db::{DbPool, PipelineRepository};
use common::queue::{NatsClient, NatsConfig, NatsPipelineLauncher};
use common::starter::StarterService;
use common::telemetry;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

mod handlers;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize tracing/logging
    telemetry::init_logging(&settings.observability.log_level)?;
    info!("Starting pipeline starter service");

    // Initialize Prometheus metrics exporter
    telemetry::init_metrics(settings.observability.metrics_port)?;

    // Initialize database connection pool
    let db_pool = DbPool::new(&settings.database).await.map_err(|e| {
        error!(error = %e, "Failed to initialize database pool");
        anyhow::anyhow!("Database error: {}", e)
    })?;

    // Initialize NATS client and the start-order stream
    let nats_config = NatsConfig {
        url: settings.nats.url.clone(),
        stream_name: settings.nats.stream_name.clone(),
        ..NatsConfig::default()
    };
    let nats_client = NatsClient::new(nats_config).await.map_err(|e| {
        error!(error = %e, "Failed to initialize NATS client");
        anyhow::anyhow!("Queue error: {}", e)
    })?;
    nats_client.initialize_stream().await.map_err(|e| {
        error!(error = %e, "Failed to initialize NATS stream");
        anyhow::anyhow!("Queue error: {}", e)
    })?;

    // Wire the starter service from its capabilities
    let store = Arc::new(PipelineRepository::new(db_pool.clone()));
    let launcher = Arc::new(NatsPipelineLauncher::new(nats_client));
    let service = StarterService::new(store, launcher);
    info!("Starter service wired");

    // Create router
    let state = AppState::new(service);
    let app = routes::create_router(state);

    // Start server
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("Starter service stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown");
}
