//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (request outcomes, inference latency, batch size, model loads)
//! - Structured JSON logging with tracing

use crate::error::PredictError;
use crate::schema::ModelKind;
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::fmt::Display;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Buckets for rows per batch
const BATCH_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictMetricsInner> = OnceLock::new();

struct PredictMetricsInner {
    requests_total: IntCounterVec,
    inference_latency_seconds: HistogramVec,
    batch_rows: HistogramVec,
    model_loads_total: IntCounterVec,
    model_load_seconds: HistogramVec,
    model_version_info: GaugeVec,
}

impl PredictMetricsInner {
    fn new() -> Self {
        Self {
            requests_total: register_int_counter_vec!(
                "predict_requests_total",
                "Prediction requests by model and outcome",
                &["model", "outcome"]
            )
            .expect("Failed to register requests_total"),

            inference_latency_seconds: register_histogram_vec!(
                "predict_inference_latency_seconds",
                "Time spent running the model pipeline on a batch",
                &["model"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            batch_rows: register_histogram_vec!(
                "predict_batch_rows",
                "Rows per prediction batch",
                &["model"],
                BATCH_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_rows"),

            model_loads_total: register_int_counter_vec!(
                "predict_model_loads_total",
                "Artifact load attempts by model and result",
                &["model", "result"]
            )
            .expect("Failed to register model_loads_total"),

            model_load_seconds: register_histogram_vec!(
                "predict_model_load_seconds",
                "Time spent deserializing model artifacts",
                &["model"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register model_load_seconds"),

            model_version_info: register_gauge_vec!(
                "predict_model_version_info",
                "Version of the currently loaded artifact per model",
                &["model", "version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Lightweight handle to the global prediction metrics.
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PredictMetrics {
    _private: (),
}

impl Default for PredictMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictMetricsInner::new)
    }

    /// Count a finished request; `outcome` is `ok` or an error kind
    pub fn inc_request(&self, model: ModelKind, outcome: &str) {
        self.inner()
            .requests_total
            .with_label_values(&[model.as_str(), outcome])
            .inc();
    }

    pub fn observe_inference(&self, model: ModelKind, duration_secs: f64, rows: usize) {
        let inner = self.inner();
        inner
            .inference_latency_seconds
            .with_label_values(&[model.as_str()])
            .observe(duration_secs);
        inner
            .batch_rows
            .with_label_values(&[model.as_str()])
            .observe(rows as f64);
    }

    pub fn observe_model_load(&self, model: ModelKind, duration_secs: f64, success: bool) {
        let inner = self.inner();
        let result = if success { "ok" } else { "failed" };
        inner
            .model_loads_total
            .with_label_values(&[model.as_str(), result])
            .inc();
        if success {
            inner
                .model_load_seconds
                .with_label_values(&[model.as_str()])
                .observe(duration_secs);
        }
    }

    pub fn set_model_version(&self, model: ModelKind, version: &str) {
        self.inner()
            .model_version_info
            .with_label_values(&[model.as_str(), version])
            .set(1.0);
    }

    /// Current request count, mainly for tests
    pub fn request_count(&self, model: ModelKind, outcome: &str) -> u64 {
        self.inner()
            .requests_total
            .with_label_values(&[model.as_str(), outcome])
            .get()
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for model loads, predictions
/// and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_dir: &Path) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_dir = %model_dir.display(),
            "Prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }

    pub fn log_model_loaded(&self, model: ModelKind, version: &str, checksum: &str, elapsed_ms: u128) {
        info!(
            event = "model_loaded",
            service = %self.service,
            model = %model,
            version = %version,
            checksum = %checksum,
            elapsed_ms = elapsed_ms as u64,
            "Model artifact loaded"
        );
    }

    pub fn log_model_load_failed(&self, model: ModelKind, path: &Path, err: &dyn Display) {
        error!(
            event = "model_load_failed",
            service = %self.service,
            model = %model,
            path = %path.display(),
            error = %err,
            "Model artifact could not be loaded"
        );
    }

    pub fn log_prediction(&self, model: ModelKind, rows: usize, elapsed_ms: u128) {
        info!(
            event = "prediction_served",
            service = %self.service,
            model = %model,
            rows = rows,
            elapsed_ms = elapsed_ms as u64,
            "Served prediction"
        );
    }

    pub fn log_prediction_failed(&self, model: ModelKind, err: &PredictError) {
        if err.is_client_error() {
            warn!(
                event = "prediction_rejected",
                service = %self.service,
                model = %model,
                kind = err.kind(),
                field = ?err.field(),
                error = %err,
                "Rejected prediction request"
            );
        } else {
            error!(
                event = "prediction_failed",
                service = %self.service,
                model = %model,
                kind = err.kind(),
                error = %err,
                "Prediction failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InputIssue;

    #[test]
    fn test_metrics_handles_share_state() {
        let a = PredictMetrics::new();
        let b = a.clone();
        let before = b.request_count(ModelKind::CostEstimation, "ok");
        a.inc_request(ModelKind::CostEstimation, "ok");
        assert_eq!(b.request_count(ModelKind::CostEstimation, "ok"), before + 1);

        a.observe_inference(ModelKind::DelayPrediction, 0.002, 5);
        a.observe_model_load(ModelKind::DelayPrediction, 0.01, true);
        a.observe_model_load(ModelKind::DelayPrediction, 0.01, false);
        a.set_model_version(ModelKind::DelayPrediction, "v1");
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-service");
        assert_eq!(logger.service, "test-service");
        logger.log_prediction_failed(
            ModelKind::CostEstimation,
            &PredictError::invalid("Humidity", InputIssue::Missing),
        );
    }
}
