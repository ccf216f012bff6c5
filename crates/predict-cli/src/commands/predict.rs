//! Prediction, health and example-payload commands

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use predict_lib::{
    predictor::validate, samples::sample_for, FeatureRecordSet, HealthResponse, ModelKind,
    PredictionDocument, ReadinessResponse,
};
use reqwest::StatusCode;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, StatusResponse};
use crate::output::{
    color_status, format_hours, format_usd, print_success, print_table, print_warning,
    OutputFormat,
};

/// Model selector on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    /// Construction cost estimation
    Cost,
    /// Logistics time delay
    Delay,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Cost => ModelKind::CostEstimation,
            ModelArg::Delay => ModelKind::DelayPrediction,
        }
    }
}

/// Row for the predictions table
#[derive(Tabled, Serialize)]
struct PredictionRow {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "Prediction")]
    prediction: String,
}

/// Row for the component health table
#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Read a record set from `path`, or stdin when `path` is `-`
pub fn read_records(path: &Path) -> Result<FeatureRecordSet> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read records from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    serde_json::from_str(&content).context("Records must be a JSON object of field arrays")
}

fn format_prediction(model: ModelKind, value: f64) -> String {
    match model {
        ModelKind::CostEstimation => format_usd(value),
        ModelKind::DelayPrediction => format_hours(value),
    }
}

fn prediction_rows(model: ModelKind, values: &[f64]) -> Vec<PredictionRow> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| PredictionRow {
            row,
            prediction: format_prediction(model, *value),
        })
        .collect()
}

/// Send a record set to the model's endpoint and print the predictions
pub async fn run_prediction(
    client: &ApiClient,
    model: ModelKind,
    file: &Path,
    format: OutputFormat,
) -> Result<()> {
    let records = read_records(file)?;

    // Catch malformed input before the round trip
    validate(&records, model.schema()).map_err(|e| anyhow::anyhow!("Invalid input: {}", e))?;

    let document: PredictionDocument = client.post(model.endpoint(), &records).await?;
    let values = document.values_for(model).with_context(|| {
        format!("Response has no '{}' entry", model.response_label())
    })?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&document.0)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", model.response_label().bold());
            print_table(&prediction_rows(model, values), format);
        }
    }

    Ok(())
}

/// Show service liveness, readiness and per-model health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: StatusResponse = client.get("/").await?;
    let (_, health): (StatusCode, HealthResponse) = client.get_report("/healthz").await?;
    let (_, readiness): (StatusCode, ReadinessResponse) = client.get_report("/readyz").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "status": status.status,
                "health": health,
                "readiness": readiness,
            }))?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            print_success(&status.status);

            let overall = serde_json::to_value(health.status)?
                .as_str()
                .unwrap_or_default()
                .to_string();
            println!("{} {}", "Overall:".bold(), color_status(&overall));

            if readiness.ready {
                println!("{} {}", "Readiness:".bold(), color_status("ready"));
            } else {
                println!("{} {}", "Readiness:".bold(), color_status("not ready"));
                if let Some(reason) = &readiness.reason {
                    print_warning(reason);
                }
            }
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| {
                    let status = serde_json::to_value(component.status)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default();
                    ComponentRow {
                        component: name.clone(),
                        status: color_status(&status),
                        message: component.message.clone().unwrap_or_default(),
                    }
                })
                .collect();
            rows.sort_by(|a, b| a.component.cmp(&b.component));
            print_table(&rows, format);
        }
    }

    Ok(())
}

/// Print the example payload for `model`
pub fn show_example(model: ModelKind) -> Result<()> {
    let json = serde_json::to_string_pretty(&sample_for(model))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_model_arg_conversion() {
        assert_eq!(ModelKind::from(ModelArg::Cost), ModelKind::CostEstimation);
        assert_eq!(ModelKind::from(ModelArg::Delay), ModelKind::DelayPrediction);
    }

    #[test]
    fn test_read_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::to_string(&sample_for(ModelKind::CostEstimation)).unwrap();
        file.write_all(body.as_bytes()).unwrap();

        let records = read_records(file.path()).unwrap();
        assert_eq!(records, sample_for(ModelKind::CostEstimation));
        assert!(validate(&records, ModelKind::CostEstimation.schema()).is_ok());
    }

    #[test]
    fn test_read_records_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2, 3]").unwrap();
        assert!(read_records(file.path()).is_err());
    }

    #[test]
    fn test_read_records_missing_file() {
        let err = read_records(Path::new("/nonexistent/records.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_prediction_rows() {
        let rows = prediction_rows(ModelKind::CostEstimation, &[15_000_000.0, 1_250.5]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 0);
        assert_eq!(rows[0].prediction, "$15,000,000.00");
        assert_eq!(rows[1].prediction, "$1,250.50");

        let rows = prediction_rows(ModelKind::DelayPrediction, &[3.5]);
        assert_eq!(rows[0].prediction, "3.50 h");
    }
}
