//! Projection of validated records onto the model column layout

use crate::error::{PredictError, Result};
use crate::models::{Column, FeatureColumn, FeatureTable, FeatureValues, ValidatedRecords};
use crate::schema::{ColumnKind, ModelKind, Schema};

/// Builds the feature table for one schema.
///
/// Output columns follow `schema.columns` exactly. Input columns not named
/// there are dropped.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSelector {
    schema: &'static Schema,
}

impl FeatureSelector {
    pub fn new(schema: &'static Schema) -> Self {
        Self { schema }
    }

    pub fn select(&self, records: &ValidatedRecords) -> Result<FeatureTable> {
        let columns = self
            .schema
            .columns
            .iter()
            .map(|spec| {
                let column = records
                    .column(spec.name)
                    .ok_or_else(|| PredictError::MissingFeature {
                        column: spec.name.to_string(),
                    })?;
                Ok(FeatureColumn {
                    name: spec.name.to_string(),
                    values: convert(self.schema.model, spec.name, spec.kind, column)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureTable {
            rows: records.rows,
            columns,
        })
    }
}

/// A kind mismatch here means the schema's fields and columns disagree,
/// which validated input cannot cause.
fn convert(model: ModelKind, name: &str, kind: ColumnKind, column: &Column) -> Result<FeatureValues> {
    match (kind, column) {
        (ColumnKind::Numeric, Column::Float(v)) => Ok(FeatureValues::Numeric(v.clone())),
        (ColumnKind::Numeric, Column::Integer(v)) => {
            Ok(FeatureValues::Numeric(v.iter().map(|&i| i as f64).collect()))
        }
        (ColumnKind::Categorical, Column::Categorical(v)) => {
            Ok(FeatureValues::Categorical(v.clone()))
        }
        (kind, other) => Err(PredictError::inference(
            model,
            format!(
                "column '{}' should be {:?}, got {} values",
                name,
                kind,
                other.type_name()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::validator::validate;
    use crate::schema::{COST_ESTIMATION_SCHEMA, DELAY_PREDICTION_SCHEMA};
    use crate::testing::cost_records;
    use std::collections::HashMap;

    #[test]
    fn test_columns_follow_schema_order() {
        let validated = validate(&cost_records(), &COST_ESTIMATION_SCHEMA).unwrap();
        let table = FeatureSelector::new(&COST_ESTIMATION_SCHEMA)
            .select(&validated)
            .unwrap();
        let expected: Vec<_> = COST_ESTIMATION_SCHEMA.column_names().collect();
        assert_eq!(table.column_names(), expected);
        assert_eq!(table.rows, 1);
    }

    #[test]
    fn test_order_independent_of_input_map() {
        // Same columns inserted in reverse order produce the same table
        let validated = validate(&cost_records(), &COST_ESTIMATION_SCHEMA).unwrap();
        let mut reversed = HashMap::new();
        for spec in COST_ESTIMATION_SCHEMA.columns.iter().rev() {
            reversed.insert(
                spec.name.to_string(),
                validated.column(spec.name).unwrap().clone(),
            );
        }
        let reversed = ValidatedRecords {
            rows: validated.rows,
            columns: reversed,
        };

        let selector = FeatureSelector::new(&COST_ESTIMATION_SCHEMA);
        assert_eq!(
            selector.select(&validated).unwrap(),
            selector.select(&reversed).unwrap()
        );
    }

    #[test]
    fn test_integer_columns_become_numeric() {
        let validated = validate(&cost_records(), &COST_ESTIMATION_SCHEMA).unwrap();
        let table = FeatureSelector::new(&COST_ESTIMATION_SCHEMA)
            .select(&validated)
            .unwrap();
        assert_eq!(
            table.column("Accident_Count"),
            Some(&FeatureValues::Numeric(vec![8.0]))
        );
        assert_eq!(
            table.column("Weather_Condition"),
            Some(&FeatureValues::Categorical(vec!["Snowy".to_string()]))
        );
    }

    #[test]
    fn test_missing_derived_column() {
        // Delay records without derivation lack the calendar columns
        let mut columns = HashMap::new();
        for spec in DELAY_PREDICTION_SCHEMA.fields {
            columns.insert(spec.name.to_string(), Column::Float(vec![0.0]));
        }
        let records = ValidatedRecords { rows: 1, columns };
        let err = FeatureSelector::new(&DELAY_PREDICTION_SCHEMA)
            .select(&records)
            .unwrap_err();
        match err {
            PredictError::MissingFeature { column } => assert_eq!(column, "month"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wrong_column_type_is_server_error() {
        let mut validated = validate(&cost_records(), &COST_ESTIMATION_SCHEMA).unwrap();
        validated
            .columns
            .insert("Project_Type".to_string(), Column::Float(vec![1.0]));
        let err = FeatureSelector::new(&COST_ESTIMATION_SCHEMA)
            .select(&validated)
            .unwrap_err();
        assert!(matches!(
            err,
            PredictError::Inference {
                model: ModelKind::CostEstimation,
                ..
            }
        ));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("Project_Type"));
    }
}
