//! Model invocation with a load-once artifact cache
//!
//! Each invoker owns the handle for one model. The first call deserializes
//! the artifact; concurrent first callers block on the same load rather than
//! racing. A failed load leaves the cache empty so a later call can retry
//! once the artifact is fixed. A loaded artifact is never replaced.

use crate::artifact::{ArtifactError, ModelArtifact};
use crate::error::{PredictError, Result};
use crate::models::FeatureTable;
use crate::observability::{PredictMetrics, StructuredLogger};
use crate::schema::ModelKind;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
const SLOW_INFERENCE_MS: u128 = 250;

/// Lazily-loaded, process-lifetime handle to one model artifact
pub struct ModelInvoker {
    model: ModelKind,
    path: PathBuf,
    artifact: OnceCell<Arc<ModelArtifact>>,
    metrics: PredictMetrics,
    logger: StructuredLogger,
    load_count: AtomicU64,
    prediction_count: AtomicU64,
    row_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl ModelInvoker {
    /// Invoker reading `model`'s artifact from `model_dir`
    pub fn new(model: ModelKind, model_dir: &Path) -> Self {
        Self::with_path(model, model_dir.join(model.artifact_file_name()))
    }

    pub fn with_path(model: ModelKind, path: PathBuf) -> Self {
        Self {
            model,
            path,
            artifact: OnceCell::new(),
            metrics: PredictMetrics::new(),
            logger: StructuredLogger::new("predict-lib"),
            load_count: AtomicU64::new(0),
            prediction_count: AtomicU64::new(0),
            row_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.get().is_some()
    }

    /// Version of the loaded artifact, if any
    pub fn loaded_version(&self) -> Option<String> {
        self.artifact.get().map(|a| a.version().to_string())
    }

    /// Return the cached artifact, loading it on first use
    pub fn artifact(&self) -> Result<Arc<ModelArtifact>> {
        self.artifact
            .get_or_try_init(|| self.load())
            .map(Arc::clone)
    }

    fn load(&self) -> Result<Arc<ModelArtifact>> {
        let start = Instant::now();
        self.load_count.fetch_add(1, Ordering::Relaxed);

        match ModelArtifact::load(&self.path, self.model) {
            Ok(artifact) => {
                let elapsed = start.elapsed();
                self.metrics.observe_model_load(self.model, elapsed.as_secs_f64(), true);
                self.metrics.set_model_version(self.model, artifact.version());
                self.logger.log_model_loaded(
                    self.model,
                    artifact.version(),
                    artifact.checksum(),
                    elapsed.as_millis(),
                );
                Ok(Arc::new(artifact))
            }
            Err(err) => {
                self.metrics.observe_model_load(self.model, start.elapsed().as_secs_f64(), false);
                // The path goes to the operator log only
                self.logger.log_model_load_failed(self.model, &self.path, &err);
                Err(PredictError::unavailable(self.model, describe_load_error(&err)))
            }
        }
    }

    /// Run the artifact on `table`, one prediction per row in row order.
    ///
    /// Non-finite outputs fail the whole batch.
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        let artifact = self.artifact()?;
        let start = Instant::now();

        let predictions = artifact
            .predict(table)
            .map_err(|e| PredictError::inference(self.model, e.to_string()))?;

        if predictions.len() != table.rows {
            return Err(PredictError::inference(
                self.model,
                format!(
                    "model returned {} predictions for {} rows",
                    predictions.len(),
                    table.rows
                ),
            ));
        }
        if let Some(row) = predictions.iter().position(|p| !p.is_finite()) {
            return Err(PredictError::inference(
                self.model,
                format!("non-finite prediction for row {}", row),
            ));
        }

        let elapsed = start.elapsed();
        self.prediction_count.fetch_add(1, Ordering::Relaxed);
        self.row_count.fetch_add(table.rows as u64, Ordering::Relaxed);
        self.metrics.observe_inference(self.model, elapsed.as_secs_f64(), table.rows);

        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                model = %self.model,
                rows = table.rows,
                elapsed_ms = elapsed.as_millis() as u64,
                "Inference exceeded {}ms",
                SLOW_INFERENCE_MS
            );
        } else {
            debug!(
                model = %self.model,
                rows = table.rows,
                elapsed_us = elapsed.as_micros() as u64,
                "Inference completed"
            );
        }

        Ok(predictions)
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            loads: self.load_count.load(Ordering::Relaxed),
            predictions: self.prediction_count.load(Ordering::Relaxed),
            rows: self.row_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

/// Caller-safe description of a load failure
fn describe_load_error(err: &ArtifactError) -> String {
    match err {
        ArtifactError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
            "artifact not found".to_string()
        }
        ArtifactError::Io(_) => "artifact could not be read".to_string(),
        ArtifactError::Parse(_) => "artifact is corrupt".to_string(),
        ArtifactError::Checksum { .. } => "artifact failed checksum verification".to_string(),
        ArtifactError::Onnx(_) => "regressor could not be loaded".to_string(),
        other => other.to_string(),
    }
}

/// Inference statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceStats {
    pub loads: u64,
    pub predictions: u64,
    pub rows: u64,
    pub slow_inferences: u64,
}
