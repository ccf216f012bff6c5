//! HTTP API: prediction routes, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predict_lib::{
    health::{ComponentStatus, HealthRegistry},
    health_check,
    observability::{PredictMetrics, StructuredLogger},
    FeatureRecordSet, ModelKind, PredictError, PredictionResponse, PredictionService,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    pub health_registry: HealthRegistry,
    pub metrics: PredictMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        service: PredictionService,
        health_registry: HealthRegistry,
        metrics: PredictMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Error returned by the prediction routes
#[derive(Debug)]
pub enum ApiError {
    /// Caller-correctable input problem
    BadRequest(String),
    /// Model or server side failure
    Internal(String),
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.public_message())
        } else {
            ApiError::Internal(err.public_message())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("Invalid input: {}", msg)),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to make prediction: {}", msg),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

async fn root() -> impl IntoResponse {
    Json(health_check())
}

async fn predict_time_delay(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeatureRecordSet>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    run_prediction(&state, ModelKind::DelayPrediction, payload).await
}

async fn predict_actual_cost(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeatureRecordSet>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    run_prediction(&state, ModelKind::CostEstimation, payload).await
}

async fn run_prediction(
    state: &AppState,
    model: ModelKind,
    payload: Result<Json<FeatureRecordSet>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(records) = payload.map_err(|rejection| {
        state.metrics.inc_request(model, "malformed_body");
        warn!(model = %model, error = %rejection.body_text(), "Rejected malformed request body");
        ApiError::BadRequest(rejection.body_text())
    })?;

    let start = Instant::now();
    let predictor = Arc::clone(state.service.predictor(model));
    let was_loaded = predictor.loaded_version().is_some();

    // Inference is CPU-bound; keep it off the async workers
    let task = {
        let predictor = Arc::clone(&predictor);
        tokio::task::spawn_blocking(move || predictor.predict(&records))
    };
    let result = task.await.map_err(|e| {
        state.metrics.inc_request(model, "task_failed");
        ApiError::Internal(format!("prediction task failed: {}", e))
    })?;

    match result {
        Ok(response) => {
            state.metrics.inc_request(model, "ok");
            state
                .logger
                .log_prediction(model, response.values().len(), start.elapsed().as_millis());
            if !was_loaded {
                if let Some(version) = predictor.loaded_version() {
                    state.health_registry.record_model_load(model, Ok(version)).await;
                }
            }
            Ok(Json(response))
        }
        Err(err) => {
            state.metrics.inc_request(model, err.kind());
            state.logger.log_prediction_failed(model, &err);
            if matches!(err, PredictError::ModelUnavailable { .. }) {
                state
                    .health_registry
                    .record_model_load(model, Err(err.public_message()))
                    .await;
            }
            Err(err.into())
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// CORS policy for the given origins; invalid entries are skipped
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route(ModelKind::DelayPrediction.endpoint(), post(predict_time_delay))
        .route(ModelKind::CostEstimation.endpoint(), post(predict_actual_cost))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Load both models through the regular load-once path and record the outcome.
///
/// Failures are logged and reported as unhealthy; they never stop startup.
pub async fn preload_models(state: &AppState) {
    for model in ModelKind::ALL {
        let predictor = Arc::clone(state.service.predictor(model));
        let outcome = match tokio::task::spawn_blocking(move || predictor.warm_up()).await {
            Ok(Ok(version)) => Ok(version),
            Ok(Err(err)) => Err(err.public_message()),
            Err(e) => Err(format!("warm-up task failed: {}", e)),
        };
        if let Err(reason) = &outcome {
            warn!(model = %model, reason = %reason, "Model preload failed");
        }
        state.health_registry.record_model_load(model, outcome).await;
    }
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve<F>(
    port: u16,
    state: Arc<AppState>,
    allowed_origins: &[String],
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state, allowed_origins);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
