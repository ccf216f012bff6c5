//! Prediction API - serves the cost estimation and time delay models over HTTP

use anyhow::{Context, Result};
use predict_api::{api, config::ApiConfig};
use predict_lib::{
    health::HealthRegistry,
    observability::{PredictMetrics, StructuredLogger},
    PredictionService,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting predict-api");

    // Load configuration
    let config = ApiConfig::load()?;
    let allowed_origins = config.allowed_origins();
    info!(
        port = config.api_port,
        model_dir = %config.model_dir.display(),
        origins = ?allowed_origins,
        "Service configured"
    );

    // Both models start pending until preloaded or first requested
    let health_registry = HealthRegistry::new();

    let metrics = PredictMetrics::new();
    let logger = StructuredLogger::new("predict-api");
    logger.log_startup(SERVICE_VERSION, &config.model_dir);

    let service = PredictionService::from_model_dir(&config.model_dir);
    let app_state = Arc::new(api::AppState::new(
        service,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    if config.preload_models {
        api::preload_models(&app_state).await;
    }

    // Mark service as ready after initialization
    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    api::serve(config.api_port, app_state, &allowed_origins, async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown_logger.log_shutdown("SIGINT received"),
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for shutdown signal");
                std::future::pending::<()>().await
            }
        }
    })
    .await
    .context("API server failed")?;

    info!("Shutting down");
    Ok(())
}
