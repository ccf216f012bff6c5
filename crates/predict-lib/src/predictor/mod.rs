//! Inference request pipeline
//!
//! validate -> (derive time features) -> select columns -> invoke model -> map response

mod features;
mod inference;
mod output;
mod selector;
mod validator;

pub use features::{
    parse_timestamp, TimeFeatureDeriver, TimeFeatures, DAY_FEATURE, DAY_OF_WEEK_FEATURE,
    IS_WEEKEND_FEATURE, MONTH_FEATURE, MONTH_NAME_FEATURE,
};
pub use inference::{InferenceStats, ModelInvoker};
pub use output::{PredictionDocument, PredictionResponse};
pub use selector::FeatureSelector;
pub use validator::validate;

use crate::error::Result;
use crate::models::{FeatureRecordSet, FeatureTable};
use crate::schema::{ModelKind, Schema};
use std::path::Path;
use std::sync::Arc;

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Run one batch end to end
    fn predict(&self, records: &FeatureRecordSet) -> Result<PredictionResponse>;

    /// Model served by this predictor
    fn model(&self) -> ModelKind;

    /// Load the model now instead of on first request; returns its version
    fn warm_up(&self) -> Result<String>;

    /// Version of the loaded model, `None` before the first successful load
    fn loaded_version(&self) -> Option<String>;
}

/// One model's full pipeline. Holds no per-request state.
pub struct PredictionPipeline {
    schema: &'static Schema,
    deriver: Option<TimeFeatureDeriver>,
    selector: FeatureSelector,
    invoker: ModelInvoker,
}

impl PredictionPipeline {
    pub fn new(invoker: ModelInvoker) -> Self {
        let schema = invoker.model().schema();
        Self {
            schema,
            deriver: schema.derives_time_features.then(TimeFeatureDeriver::new),
            selector: FeatureSelector::new(schema),
            invoker,
        }
    }

    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    /// Validation, derivation and selection, without touching the model
    pub fn prepare(&self, records: &FeatureRecordSet) -> Result<FeatureTable> {
        let mut validated = validate(records, self.schema)?;
        if let Some(deriver) = &self.deriver {
            deriver.derive(&mut validated)?;
        }
        self.selector.select(&validated)
    }
}

impl Predictor for PredictionPipeline {
    fn predict(&self, records: &FeatureRecordSet) -> Result<PredictionResponse> {
        let table = self.prepare(records)?;
        let predictions = self.invoker.predict(&table)?;
        PredictionResponse::new(self.schema.model, predictions)
    }

    fn model(&self) -> ModelKind {
        self.schema.model
    }

    fn warm_up(&self) -> Result<String> {
        self.invoker.artifact().map(|a| a.version().to_string())
    }

    fn loaded_version(&self) -> Option<String> {
        self.invoker.loaded_version()
    }
}

/// Both served models behind one handle
#[derive(Clone)]
pub struct PredictionService {
    cost: Arc<dyn Predictor>,
    delay: Arc<dyn Predictor>,
}

impl PredictionService {
    /// Service whose artifacts live in `model_dir`
    pub fn from_model_dir(model_dir: &Path) -> Self {
        Self::new(
            Arc::new(PredictionPipeline::new(ModelInvoker::new(
                ModelKind::CostEstimation,
                model_dir,
            ))),
            Arc::new(PredictionPipeline::new(ModelInvoker::new(
                ModelKind::DelayPrediction,
                model_dir,
            ))),
        )
    }

    pub fn new(cost: Arc<dyn Predictor>, delay: Arc<dyn Predictor>) -> Self {
        Self { cost, delay }
    }

    pub fn predictor(&self, model: ModelKind) -> &Arc<dyn Predictor> {
        match model {
            ModelKind::CostEstimation => &self.cost,
            ModelKind::DelayPrediction => &self.delay,
        }
    }

    pub fn predict_actual_cost(&self, records: &FeatureRecordSet) -> Result<PredictionResponse> {
        self.cost.predict(records)
    }

    pub fn predict_time_delay(&self, records: &FeatureRecordSet) -> Result<PredictionResponse> {
        self.delay.predict(records)
    }
}

/// Fixed liveness payload
pub fn health_check() -> serde_json::Value {
    serde_json::json!({ "status": "API is running" })
}
