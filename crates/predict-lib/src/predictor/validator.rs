//! Input validation against a fixed request schema
//!
//! Checks field presence, primitive type and batch length. Fields outside the
//! schema are ignored entirely. Numeric fields never accept strings, and
//! integer fields never accept fractional numbers.

use crate::error::{InputIssue, PredictError, Result};
use crate::models::{Column, FeatureRecordSet, ValidatedRecords};
use crate::schema::{FieldKind, FieldSpec, Schema};
use serde_json::Value;
use std::collections::HashMap;

/// Validate a raw record set against `schema`.
///
/// Fields are checked in schema order, so the first missing or malformed
/// field is the one reported. The batch length is taken from the first
/// schema field.
pub fn validate(records: &FeatureRecordSet, schema: &Schema) -> Result<ValidatedRecords> {
    if let Some(missing) = schema.fields.iter().find(|f| !records.contains(f.name)) {
        return Err(PredictError::invalid(missing.name, InputIssue::Missing));
    }

    let mut rows: Option<usize> = None;
    let mut columns = HashMap::with_capacity(schema.fields.len());

    for spec in schema.fields {
        let raw = records
            .get(spec.name)
            .ok_or_else(|| PredictError::invalid(spec.name, InputIssue::Missing))?;

        let values = raw.as_array().ok_or_else(|| {
            PredictError::invalid(
                spec.name,
                InputIssue::TypeMismatch(format!("expected a list of values, got {}", describe(raw))),
            )
        })?;

        if values.is_empty() {
            return Err(PredictError::invalid(spec.name, InputIssue::Empty));
        }

        match rows {
            None => rows = Some(values.len()),
            Some(expected) if expected != values.len() => {
                return Err(PredictError::invalid(
                    spec.name,
                    InputIssue::LengthMismatch {
                        expected,
                        actual: values.len(),
                    },
                ));
            }
            Some(_) => {}
        }

        columns.insert(spec.name.to_string(), coerce_column(spec, values)?);
    }

    Ok(ValidatedRecords {
        rows: rows.unwrap_or(0),
        columns,
    })
}

fn coerce_column(spec: &FieldSpec, values: &[Value]) -> Result<Column> {
    match spec.kind {
        FieldKind::Float => values
            .iter()
            .enumerate()
            .map(|(i, v)| as_float(spec, i, v))
            .collect::<Result<Vec<_>>>()
            .map(Column::Float),
        FieldKind::Integer => values
            .iter()
            .enumerate()
            .map(|(i, v)| as_integer(spec, i, v))
            .collect::<Result<Vec<_>>>()
            .map(Column::Integer),
        // Timestamps stay as text here; the time feature deriver parses them
        FieldKind::Categorical | FieldKind::Timestamp => values
            .iter()
            .enumerate()
            .map(|(i, v)| as_text(spec, i, v))
            .collect::<Result<Vec<_>>>()
            .map(Column::Categorical),
    }
}

fn as_float(spec: &FieldSpec, index: usize, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| mismatch(spec, index, "a finite number", value)),
        _ => Err(mismatch(spec, index, "a number", value)),
    }
}

fn as_integer(spec: &FieldSpec, index: usize, value: &Value) -> Result<i64> {
    let Value::Number(n) = value else {
        return Err(mismatch(spec, index, "an integer", value));
    };
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    // Whole-valued floats such as 699.0 are accepted
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(mismatch(spec, index, "an integer", value)),
    }
}

fn as_text(spec: &FieldSpec, index: usize, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(mismatch(spec, index, "a string", value)),
    }
}

fn mismatch(spec: &FieldSpec, index: usize, expected: &str, value: &Value) -> PredictError {
    PredictError::invalid(
        spec.name,
        InputIssue::TypeMismatch(format!(
            "value at index {} is {}, expected {}",
            index,
            describe(value),
            expected
        )),
    )
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
        Value::Number(_) => "a fractional number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
