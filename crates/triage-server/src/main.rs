//! Triage Server
//!
//! Serves support ticket classification over HTTP.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use triage_classifiers::{ModelCell, ModelLoader, ModelState};
use triage_server::{create_router, AppState, Cli, ServerConfig, TicketService};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting triage server");

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Model: {} ({:?})", config.model.name, config.model.source);
    info!("Labels: {}", config.labels.join(", "));

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Load the model before accepting traffic
    let state = load_model(&config).await;
    if let Some(reason) = state.failure_reason() {
        warn!("Serving in degraded mode: {}", reason);
    }
    let cell = Arc::new(ModelCell::with_state(state)?);

    let app_state = AppState::new(TicketService::new(cell)).with_metrics(metrics_handle);
    let app = create_router(app_state, config.server.max_body_bytes);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Run the blocking loader off the async workers
async fn load_model(config: &ServerConfig) -> ModelState {
    let model = config.model.clone();
    let engine = config.engine.clone();

    match tokio::task::spawn_blocking(move || ModelLoader::load(&model, &engine)).await {
        Ok(state) => state,
        Err(e) => {
            error!("Model loader task failed: {}", e);
            ModelState::Failed(format!("model loader task failed: {}", e))
        }
    }
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("triage=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("triage=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "triage_requests_total",
        "Total number of requests by endpoint and outcome"
    );
    metrics::describe_histogram!(
        "triage_inference_latency_us",
        metrics::Unit::Microseconds,
        "Classification latency in microseconds"
    );
    metrics::describe_counter!(
        "triage_inference_timeouts_total",
        "Total number of classifications that exceeded the timeout"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
