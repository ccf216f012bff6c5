//! Serialized model pipeline artifacts
//!
//! An artifact bundles the fitted scaler, one-hot encoder and regressor for
//! one model, together with the input column layout they were fit on. It is
//! a JSON document, optionally accompanied by a `<file>.sha256` sidecar.
//! Loaded artifacts are immutable.

mod encoder;
mod regressor;
mod scaler;

pub use encoder::{HandleUnknown, OneHotEncoder};
pub use regressor::{
    LinearModel, OnnxRegressor, Regressor, RegressorSpec, SplitDecision, Tree, TreeEnsemble,
    TreeNode,
};
pub use scaler::StandardScaler;

use crate::models::{FeatureTable, FeatureValues};
use crate::schema::{ColumnKind, ModelKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Only artifact layout understood by this build
pub const FORMAT_VERSION: u32 = 1;

/// Errors raised while loading or running an artifact
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },

    #[error("artifact is incompatible: {0}")]
    Incompatible(String),

    #[error("ONNX regressor could not be loaded: {0}")]
    Onnx(String),

    #[error("feature table does not match artifact layout: {0}")]
    LayoutMismatch(String),

    #[error("unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("regressor failed: {0}")]
    Regressor(String),
}

/// Input column as recorded at fit time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// Column transformer: scaled numeric columns, then one-hot blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub scaler: StandardScaler,
    pub encoder: OneHotEncoder,
}

impl Preprocessor {
    /// Width of the matrix handed to the regressor
    pub fn width(&self) -> usize {
        self.scaler.width() + self.encoder.width()
    }
}

/// On-disk artifact document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub format_version: u32,
    pub model: ModelKind,
    pub version: String,
    pub input_columns: Vec<InputColumn>,
    pub preprocessor: Preprocessor,
    pub regressor: RegressorSpec,
}

/// A loaded, validated artifact ready for inference
#[derive(Debug)]
pub struct ModelArtifact {
    model: ModelKind,
    version: String,
    checksum: String,
    input_columns: Vec<InputColumn>,
    preprocessor: Preprocessor,
    regressor: Regressor,
}

impl ModelArtifact {
    /// Read, verify and validate the artifact at `path` for `model`
    pub fn load(path: &Path, model: ModelKind) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path)?;
        let checksum = compute_checksum(&bytes);
        verify_sidecar(path, &checksum)?;

        let spec: ArtifactSpec = serde_json::from_slice(&bytes)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_spec(spec, model, checksum, base_dir)
    }

    /// Validate a parsed artifact against the compiled-in layout of `model`
    pub fn from_spec(
        spec: ArtifactSpec,
        model: ModelKind,
        checksum: String,
        base_dir: &Path,
    ) -> Result<Self, ArtifactError> {
        if spec.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Incompatible(format!(
                "format version {} is not supported (expected {})",
                spec.format_version, FORMAT_VERSION
            )));
        }
        if spec.model != model {
            return Err(ArtifactError::Incompatible(format!(
                "artifact was built for '{}', not '{}'",
                spec.model, model
            )));
        }

        check_columns(&spec.input_columns, model)?;
        check_preprocessor(&spec.preprocessor, &spec.input_columns)?;

        let width = spec.preprocessor.width();
        let regressor = Regressor::from_spec(spec.regressor, width, base_dir)?;

        Ok(Self {
            model,
            version: spec.version,
            checksum,
            input_columns: spec.input_columns,
            preprocessor: spec.preprocessor,
            regressor,
        })
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn handle_unknown(&self) -> HandleUnknown {
        self.preprocessor.encoder.handle_unknown
    }

    /// Preprocess and regress every row of `table`, in row order
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>, ArtifactError> {
        let matrix = self.transform(table)?;
        self.regressor
            .predict(&matrix, table.rows, self.preprocessor.width())
    }

    /// Row-major preprocessed matrix, `rows x width`
    pub fn transform(&self, table: &FeatureTable) -> Result<Vec<f64>, ArtifactError> {
        self.check_table(table)?;

        let width = self.preprocessor.width();
        let scaler = &self.preprocessor.scaler;
        let encoder = &self.preprocessor.encoder;
        let mut matrix = vec![0.0; table.rows * width];

        let mut numeric_idx = 0;
        let mut categorical_idx = 0;
        // Offsets of each one-hot block, after all scaled columns
        let mut block_offset = scaler.width();

        for column in &table.columns {
            match &column.values {
                FeatureValues::Numeric(values) => {
                    for (row, &value) in values.iter().enumerate() {
                        matrix[row * width + numeric_idx] = scaler.transform(numeric_idx, value);
                    }
                    numeric_idx += 1;
                }
                FeatureValues::Categorical(values) => {
                    let block = encoder.categories[categorical_idx].len();
                    for (row, value) in values.iter().enumerate() {
                        let start = row * width + block_offset;
                        encoder.encode_into(
                            categorical_idx,
                            value,
                            &mut matrix[start..start + block],
                        )?;
                    }
                    block_offset += block;
                    categorical_idx += 1;
                }
            }
        }

        Ok(matrix)
    }

    fn check_table(&self, table: &FeatureTable) -> Result<(), ArtifactError> {
        if table.columns.len() != self.input_columns.len() {
            return Err(ArtifactError::LayoutMismatch(format!(
                "expected {} columns, got {}",
                self.input_columns.len(),
                table.columns.len()
            )));
        }
        for (pos, (expected, actual)) in self.input_columns.iter().zip(&table.columns).enumerate() {
            let kind = match actual.values {
                FeatureValues::Numeric(_) => ColumnKind::Numeric,
                FeatureValues::Categorical(_) => ColumnKind::Categorical,
            };
            if expected.name != actual.name || expected.kind != kind {
                return Err(ArtifactError::LayoutMismatch(format!(
                    "column {} should be '{}' ({:?}), got '{}' ({:?})",
                    pos, expected.name, expected.kind, actual.name, kind
                )));
            }
            if actual.values.len() != table.rows {
                return Err(ArtifactError::LayoutMismatch(format!(
                    "column '{}' has {} rows, table has {}",
                    actual.name,
                    actual.values.len(),
                    table.rows
                )));
            }
        }
        Ok(())
    }
}

fn check_columns(columns: &[InputColumn], model: ModelKind) -> Result<(), ArtifactError> {
    let expected = model.schema().columns;
    let matches = columns.len() == expected.len()
        && columns
            .iter()
            .zip(expected)
            .all(|(c, e)| c.name == e.name && c.kind == e.kind);
    if !matches {
        let got: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        return Err(ArtifactError::Incompatible(format!(
            "input columns {:?} do not match the {} layout",
            got, model
        )));
    }
    Ok(())
}

fn check_preprocessor(pre: &Preprocessor, columns: &[InputColumn]) -> Result<(), ArtifactError> {
    pre.scaler.check()?;
    pre.encoder.check()?;

    let numeric: Vec<&str> = columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Numeric)
        .map(|c| c.name.as_str())
        .collect();
    let categorical: Vec<&str> = columns
        .iter()
        .filter(|c| c.kind == ColumnKind::Categorical)
        .map(|c| c.name.as_str())
        .collect();

    if pre.scaler.columns.iter().map(String::as_str).ne(numeric.iter().copied()) {
        return Err(ArtifactError::Incompatible(
            "scaler columns do not match the numeric input columns".to_string(),
        ));
    }
    if pre.encoder.columns.iter().map(String::as_str).ne(categorical.iter().copied()) {
        return Err(ArtifactError::Incompatible(
            "encoder columns do not match the categorical input columns".to_string(),
        ));
    }
    Ok(())
}

/// Hex SHA-256 of artifact bytes
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Path of the optional checksum sidecar for `path`
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

fn verify_sidecar(path: &Path, actual: &str) -> Result<(), ArtifactError> {
    let sidecar = sidecar_path(path);
    if !sidecar.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(&sidecar)?;
    // Accepts both a bare digest and `sha256sum` output
    let expected = content
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if expected != actual {
        return Err(ArtifactError::Checksum {
            expected,
            actual: actual.to_string(),
        });
    }
    Ok(())
}
