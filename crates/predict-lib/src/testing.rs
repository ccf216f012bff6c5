//! Test fixtures shared by unit and integration tests
//!
//! Artifacts here are small hand-built pipelines with the real column
//! layouts. Their predictions are meaningless but deterministic.

use crate::artifact::{
    ArtifactSpec, HandleUnknown, InputColumn, LinearModel, OneHotEncoder, Preprocessor,
    RegressorSpec, SplitDecision, StandardScaler, Tree, TreeEnsemble, TreeNode, FORMAT_VERSION,
};
use crate::models::FeatureRecordSet;
use crate::samples::{cost_estimation_sample, delay_prediction_sample};
use crate::schema::{ColumnKind, ModelKind};
use serde_json::json;
use std::path::{Path, PathBuf};

pub const PROJECT_TYPES: [&str; 5] = ["Bridge", "Building", "Dam", "Road", "Tunnel"];
pub const WEATHER_CONDITIONS: [&str; 5] = ["Cloudy", "Rainy", "Snowy", "Stormy", "Sunny"];

pub fn cost_records() -> FeatureRecordSet {
    cost_estimation_sample()
}

/// Three-row cost batch with small whole values so f32 inference is exact.
/// Planned_Cost scales to 0, 1 and -1 under the fixture scaler.
pub fn cost_batch() -> FeatureRecordSet {
    let mut records = FeatureRecordSet::new()
        .with("Project_Type", json!(["Tunnel", "Bridge", "Dam"]))
        .with("Weather_Condition", json!(["Snowy", "Sunny", "Rainy"]))
        .with("Planned_Cost", json!([10_000_000, 12_000_000, 8_000_000]));
    let rest: Vec<&str> = ModelKind::CostEstimation
        .schema()
        .fields
        .iter()
        .map(|f| f.name)
        .filter(|name| !records.contains(name))
        .collect();
    for (i, name) in rest.into_iter().enumerate() {
        let base = (i + 1) as i64;
        records.insert(name, json!([base, base * 2, base * 3]));
    }
    records
}

/// ONNX graph computing `x @ [1, 2, .., 20] + 0.5` over the cost matrix
pub const COST_LINEAR_ONNX: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/cost_linear.onnx");

/// Copy the ONNX fixture into `dir` and return its file name
pub fn copy_cost_linear_onnx(dir: &Path) -> PathBuf {
    let name = PathBuf::from("cost_linear.onnx");
    std::fs::copy(COST_LINEAR_ONNX, dir.join(&name)).expect("onnx fixture copied");
    name
}

pub fn delay_records() -> FeatureRecordSet {
    delay_prediction_sample()
}

/// Five-row delay batch spanning a weekend
pub fn delay_batch() -> FeatureRecordSet {
    let mut records = FeatureRecordSet::new().with(
        "timestamp",
        json!([
            "2021-01-01T00:00:00",
            "2021-01-02T06:15:30",
            "2021-01-03T12:30:45",
            "2021-01-04T18:45:15",
            "2021-01-05T23:59:59"
        ]),
    );
    for (i, spec) in ModelKind::DelayPrediction
        .schema()
        .fields
        .iter()
        .skip(1)
        .enumerate()
    {
        let base = (i + 1) as f64;
        records.insert(
            spec.name,
            json!([base, base * 1.1, base * 0.9, base * 1.2, base * 0.8]),
        );
    }
    records
}

fn input_columns(model: ModelKind) -> Vec<InputColumn> {
    model
        .schema()
        .columns
        .iter()
        .map(|c| InputColumn {
            name: c.name.to_string(),
            kind: c.kind,
        })
        .collect()
}

fn names_of(model: ModelKind, kind: ColumnKind) -> Vec<String> {
    model
        .schema()
        .columns
        .iter()
        .filter(|c| c.kind == kind)
        .map(|c| c.name.to_string())
        .collect()
}

fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Tree {
    Tree {
        nodes: vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
                default_left: false,
            },
            TreeNode::Leaf { value: left },
            TreeNode::Leaf { value: right },
        ],
    }
}

/// Cost pipeline: scaler + encoder + three stumps
pub fn cost_artifact_spec() -> ArtifactSpec {
    let model = ModelKind::CostEstimation;
    let numeric = names_of(model, ColumnKind::Numeric);
    let n = numeric.len();
    let mut mean = vec![0.0; n];
    let mut scale = vec![1.0; n];
    // Planned_Cost around ten million
    mean[0] = 10_000_000.0;
    scale[0] = 2_000_000.0;

    ArtifactSpec {
        format_version: FORMAT_VERSION,
        model,
        version: "test-1".to_string(),
        input_columns: input_columns(model),
        preprocessor: Preprocessor {
            scaler: StandardScaler::new(numeric, mean, scale),
            encoder: OneHotEncoder::new(
                names_of(model, ColumnKind::Categorical),
                vec![
                    PROJECT_TYPES.iter().map(|s| s.to_string()).collect(),
                    WEATHER_CONDITIONS.iter().map(|s| s.to_string()).collect(),
                ],
                HandleUnknown::Ignore,
            ),
        },
        regressor: RegressorSpec::GradientBoostedTrees(TreeEnsemble {
            base_score: 12_000_000.0,
            decision: SplitDecision::LessOrEqual,
            trees: vec![
                // Planned_Cost (scaled)
                stump(0, 0.0, -1_000_000.0, 2_000_000.0),
                // Project_Type == Tunnel
                stump(n + 4, 0.5, 0.0, 750_000.0),
                // Weather_Condition == Snowy
                stump(n + 5 + 2, 0.5, 0.0, 250_000.0),
            ],
        }),
    }
}

/// Delay pipeline: scaler + month encoder + linear model with distinct weights
pub fn delay_artifact_spec() -> ArtifactSpec {
    let model = ModelKind::DelayPrediction;
    let numeric = names_of(model, ColumnKind::Numeric);
    let n = numeric.len();
    let months: Vec<String> = [
        "April", "August", "December", "February", "January", "July", "June", "March", "May",
        "November", "October", "September",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let width = n + months.len();

    ArtifactSpec {
        format_version: FORMAT_VERSION,
        model,
        version: "test-1".to_string(),
        input_columns: input_columns(model),
        preprocessor: Preprocessor {
            scaler: StandardScaler::new(numeric, vec![0.0; n], vec![1.0; n]),
            encoder: OneHotEncoder::new(
                names_of(model, ColumnKind::Categorical),
                vec![months],
                HandleUnknown::Ignore,
            ),
        },
        regressor: RegressorSpec::Linear(LinearModel {
            intercept: 0.5,
            coefficients: (0..width).map(|i| 0.01 * (i + 1) as f64).collect(),
        }),
    }
}

pub fn artifact_spec_for(model: ModelKind) -> ArtifactSpec {
    match model {
        ModelKind::CostEstimation => cost_artifact_spec(),
        ModelKind::DelayPrediction => delay_artifact_spec(),
    }
}

/// Write `spec` into `dir` under the model's artifact file name
pub fn write_artifact(dir: &Path, spec: &ArtifactSpec) -> PathBuf {
    let path = dir.join(spec.model.artifact_file_name());
    let body = serde_json::to_vec_pretty(spec).expect("artifact serializes");
    std::fs::write(&path, body).expect("artifact written");
    path
}

/// Write both fixture artifacts into `dir`
pub fn write_all_artifacts(dir: &Path) {
    for model in ModelKind::ALL {
        write_artifact(dir, &artifact_spec_for(model));
    }
}
