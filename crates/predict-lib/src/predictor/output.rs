//! Response mapping
//!
//! Wraps raw predictions into the single-key response document, e.g.
//! `{"Time Delay (In Hours)": [4.2, 3.9]}`.

use crate::error::{PredictError, Result};
use crate::schema::ModelKind;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Predictions for one batch, positionally aligned with the input rows
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    label: &'static str,
    values: Vec<f64>,
}

impl PredictionResponse {
    /// Build the response for `model`; every value must be finite
    pub fn new(model: ModelKind, values: Vec<f64>) -> Result<Self> {
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictError::inference(
                model,
                format!("prediction for row {} is not a finite number", row),
            ));
        }
        Ok(Self {
            label: model.response_label(),
            values,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl Serialize for PredictionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.label, &self.values)?;
        map.end()
    }
}

/// Client-side view of a response document
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PredictionDocument(pub BTreeMap<String, Vec<f64>>);

impl PredictionDocument {
    /// Predictions under `model`'s label
    pub fn values_for(&self, model: ModelKind) -> Option<&[f64]> {
        self.0.get(model.response_label()).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_single_key() {
        let response = PredictionResponse::new(ModelKind::DelayPrediction, vec![1.5, 2.0]).unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"Time Delay (In Hours)": [1.5, 2.0]})
        );
    }

    #[test]
    fn test_cost_label() {
        let response = PredictionResponse::new(ModelKind::CostEstimation, vec![10.0]).unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["Predicted Actual Cost of Project (USD)"], json!([10.0]));
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = PredictionResponse::new(ModelKind::CostEstimation, vec![1.0, f64::NAN]).unwrap_err();
        assert!(!err.is_client_error());
        assert!(PredictionResponse::new(ModelKind::CostEstimation, vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_document_lookup() {
        let doc: PredictionDocument =
            serde_json::from_value(json!({"Time Delay (In Hours)": [3.25]})).unwrap();
        assert_eq!(doc.values_for(ModelKind::DelayPrediction), Some(&[3.25][..]));
        assert!(doc.values_for(ModelKind::CostEstimation).is_none());
    }
}
