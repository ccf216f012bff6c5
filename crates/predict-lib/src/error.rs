//! Error taxonomy for the inference pipeline
//!
//! Client-side failures carry the offending field so the caller can fix the
//! request. Server-side failures carry the model name and a reason that is
//! safe to show to callers; artifact paths are only ever logged.

use crate::schema::ModelKind;
use std::fmt;

/// Why a field of the request was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputIssue {
    /// Required field absent from the record set
    Missing,
    /// Value not coercible to the declared field type
    TypeMismatch(String),
    /// Field length differs from the batch length
    LengthMismatch { expected: usize, actual: usize },
    /// Field holds no values
    Empty,
    /// Timestamp value does not parse as a date/time
    InvalidTimestamp(String),
}

impl fmt::Display for InputIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputIssue::Missing => write!(f, "field required"),
            InputIssue::TypeMismatch(detail) => write!(f, "type mismatch: {}", detail),
            InputIssue::LengthMismatch { expected, actual } => write!(
                f,
                "length mismatch: expected {} values, got {}",
                expected, actual
            ),
            InputIssue::Empty => write!(f, "must contain at least one value"),
            InputIssue::InvalidTimestamp(value) => {
                write!(f, "could not parse '{}' as an ISO-8601 date/time", value)
            }
        }
    }
}

/// Errors raised by the prediction pipeline
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("field '{field}': {issue}")]
    InvalidInput { field: String, issue: InputIssue },

    #[error("missing feature column '{column}'")]
    MissingFeature { column: String },

    #[error("model '{model}' unavailable: {reason}")]
    ModelUnavailable { model: ModelKind, reason: String },

    #[error("inference failed for model '{model}': {reason}")]
    Inference { model: ModelKind, reason: String },
}

impl PredictError {
    pub fn invalid(field: impl Into<String>, issue: InputIssue) -> Self {
        PredictError::InvalidInput {
            field: field.into(),
            issue,
        }
    }

    pub fn unavailable(model: ModelKind, reason: impl Into<String>) -> Self {
        PredictError::ModelUnavailable {
            model,
            reason: reason.into(),
        }
    }

    pub fn inference(model: ModelKind, reason: impl Into<String>) -> Self {
        PredictError::Inference {
            model,
            reason: reason.into(),
        }
    }

    /// True when the caller sent something the pipeline cannot accept
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictError::InvalidInput { .. } | PredictError::MissingFeature { .. }
        )
    }

    /// Short classification label used in metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::InvalidInput { .. } => "invalid_input",
            PredictError::MissingFeature { .. } => "missing_feature",
            PredictError::ModelUnavailable { .. } => "model_unavailable",
            PredictError::Inference { .. } => "inference",
        }
    }

    /// The field or column a client error refers to
    pub fn field(&self) -> Option<&str> {
        match self {
            PredictError::InvalidInput { field, .. } => Some(field.as_str()),
            PredictError::MissingFeature { column } => Some(column.as_str()),
            _ => None,
        }
    }

    /// Message that can be returned to the caller
    pub fn public_message(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, PredictError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_classification() {
        let err = PredictError::invalid("Planned_Cost", InputIssue::Missing);
        assert!(err.is_client_error());
        assert_eq!(err.field(), Some("Planned_Cost"));
        assert_eq!(err.kind(), "invalid_input");

        let err = PredictError::MissingFeature {
            column: "month".to_string(),
        };
        assert!(err.is_client_error());
        assert_eq!(err.field(), Some("month"));
    }

    #[test]
    fn test_server_classification() {
        let err = PredictError::unavailable(ModelKind::CostEstimation, "artifact not found");
        assert!(!err.is_client_error());
        assert_eq!(err.kind(), "model_unavailable");
        assert!(err.field().is_none());

        let err = PredictError::inference(ModelKind::DelayPrediction, "non-finite output");
        assert!(!err.is_client_error());
        assert_eq!(err.kind(), "inference");
    }

    #[test]
    fn test_message_names_field() {
        let err = PredictError::invalid(
            "Humidity",
            InputIssue::LengthMismatch {
                expected: 2,
                actual: 3,
            },
        );
        let msg = err.public_message();
        assert!(msg.contains("Humidity"));
        assert!(msg.contains("expected 2"));
    }
}
