//! Core data models for the inference pipeline

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One batch of prediction input, column-oriented, as received from a caller.
///
/// Values are kept as raw JSON until the validator has checked them against
/// the target schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecordSet {
    fields: BTreeMap<String, serde_json::Value>,
}

impl FeatureRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and clients
    pub fn with(mut self, name: impl Into<String>, values: serde_json::Value) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: serde_json::Value) {
        self.fields.insert(name.into(), values);
    }

    pub fn remove(&mut self, name: &str) -> Option<serde_json::Value> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for FeatureRecordSet {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map.into_iter().collect(),
        }
    }
}

/// A validated, typed column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Integer(Vec<i64>),
    Categorical(Vec<String>),
    Timestamp(Vec<NaiveDateTime>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Integer(v) => v.len(),
            Column::Categorical(v) => v.len(),
            Column::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Column::Float(_) => "float",
            Column::Integer(_) => "integer",
            Column::Categorical(_) => "string",
            Column::Timestamp(_) => "timestamp",
        }
    }
}

/// Record set after validation: every column typed and `rows` long
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecords {
    pub rows: usize,
    pub columns: HashMap<String, Column>,
}

impl ValidatedRecords {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }
}

/// Values of one model input column
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl FeatureValues {
    pub fn len(&self) -> usize {
        match self {
            FeatureValues::Numeric(v) => v.len(),
            FeatureValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: FeatureValues,
}

/// Dense feature table in the exact column order of the model
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub rows: usize,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureValues> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_set_deserializes_from_object() {
        let records: FeatureRecordSet =
            serde_json::from_value(json!({"a": [1, 2], "b": ["x", "y"]})).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.contains("a"));
        assert_eq!(records.get("b"), Some(&json!(["x", "y"])));
    }

    #[test]
    fn test_record_set_rejects_non_object() {
        let parsed: Result<FeatureRecordSet, _> = serde_json::from_value(json!([1, 2, 3]));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_column_len() {
        assert_eq!(Column::Float(vec![1.0, 2.0]).len(), 2);
        assert!(Column::Categorical(vec![]).is_empty());
        assert_eq!(Column::Integer(vec![1]).type_name(), "integer");
    }
}
