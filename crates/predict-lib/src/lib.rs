//! Core library for the project insights prediction service
//!
//! This crate provides:
//! - Input schemas for the cost estimation and delay prediction models
//! - Validation, time-feature derivation and column selection
//! - Serialized model artifacts (preprocessor + regressor) and their load-once cache
//! - Health checks and observability

pub mod artifact;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod samples;
pub mod schema;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{InputIssue, PredictError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PredictMetrics, StructuredLogger};
pub use predictor::{
    health_check, PredictionDocument, PredictionPipeline, PredictionResponse, PredictionService,
    Predictor,
};
pub use schema::ModelKind;
