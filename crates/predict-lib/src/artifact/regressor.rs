//! Regressors that consume the preprocessed feature matrix
//!
//! Tree ensembles and linear models are evaluated natively. ONNX graphs are
//! run through tract one `[1, F]` f32 row at a time.

use super::ArtifactError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Comparison used at split nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitDecision {
    /// Go left when `x < threshold` (XGBoost)
    LessThan,
    /// Go left when `x <= threshold` (LightGBM)
    #[default]
    LessOrEqual,
}

/// A node of a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Direction for NaN inputs
        #[serde(default)]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

/// Tree stored as a flat node list rooted at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn check(&self, index: usize, width: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::Incompatible(format!("tree {} is empty", index)));
        }
        for (pos, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } = node
            {
                // Children always sit after their parent, so traversal terminates
                let children_ok = *left > pos
                    && *right > pos
                    && *left < self.nodes.len()
                    && *right < self.nodes.len();
                if !children_ok || *feature >= width || threshold.is_nan() {
                    return Err(ArtifactError::Incompatible(format!(
                        "tree {} node {} is malformed",
                        index, pos
                    )));
                }
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: &[f64], decision: SplitDecision) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[*feature];
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        match decision {
                            SplitDecision::LessThan => x < *threshold,
                            SplitDecision::LessOrEqual => x <= *threshold,
                        }
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// Additive tree ensemble: `base_score + sum(tree outputs)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub decision: SplitDecision,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|t| t.predict_row(row, self.decision))
                .sum::<f64>()
    }
}

/// Linear model: `intercept + coefficients · x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Regressor section of the artifact document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegressorSpec {
    GradientBoostedTrees(TreeEnsemble),
    Linear(LinearModel),
    /// ONNX graph stored next to the artifact
    Onnx { path: PathBuf },
}

/// Loaded regressor
pub enum Regressor {
    Trees(TreeEnsemble),
    Linear(LinearModel),
    Onnx(OnnxRegressor),
}

impl std::fmt::Debug for Regressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regressor::Trees(t) => f
                .debug_struct("Trees")
                .field("trees", &t.trees.len())
                .finish(),
            Regressor::Linear(l) => f
                .debug_struct("Linear")
                .field("coefficients", &l.coefficients.len())
                .finish(),
            Regressor::Onnx(_) => f.write_str("Onnx"),
        }
    }
}

impl Regressor {
    /// Build the runtime regressor, checking it against the matrix width
    pub fn from_spec(spec: RegressorSpec, width: usize, base_dir: &Path) -> Result<Self, ArtifactError> {
        match spec {
            RegressorSpec::GradientBoostedTrees(ensemble) => {
                if ensemble.trees.is_empty() {
                    return Err(ArtifactError::Incompatible("ensemble has no trees".to_string()));
                }
                for (i, tree) in ensemble.trees.iter().enumerate() {
                    tree.check(i, width)?;
                }
                Ok(Regressor::Trees(ensemble))
            }
            RegressorSpec::Linear(model) => {
                if model.coefficients.len() != width {
                    return Err(ArtifactError::Incompatible(format!(
                        "linear model has {} coefficients, preprocessor emits {} features",
                        model.coefficients.len(),
                        width
                    )));
                }
                Ok(Regressor::Linear(model))
            }
            RegressorSpec::Onnx { path } => {
                let full = base_dir.join(path);
                OnnxRegressor::load(&full, width).map(Regressor::Onnx)
            }
        }
    }

    /// Predict every row of a row-major `rows x width` matrix
    pub fn predict(&self, matrix: &[f64], rows: usize, width: usize) -> Result<Vec<f64>, ArtifactError> {
        match self {
            Regressor::Trees(ensemble) => Ok(matrix
                .chunks_exact(width.max(1))
                .take(rows)
                .map(|row| ensemble.predict_row(row))
                .collect()),
            Regressor::Linear(model) => Ok(matrix
                .chunks_exact(width.max(1))
                .take(rows)
                .map(|row| model.predict_row(row))
                .collect()),
            Regressor::Onnx(onnx) => onnx.predict(matrix, rows, width),
        }
    }
}

/// ONNX regressor executed with tract
pub struct OnnxRegressor {
    model: TractModel,
    width: usize,
}

impl OnnxRegressor {
    pub fn load(path: &Path, width: usize) -> Result<Self, ArtifactError> {
        let model =
            Self::load_model(path, width).map_err(|e| ArtifactError::Onnx(format!("{:#}", e)))?;
        Ok(Self { model, width })
    }

    fn load_model(path: &Path, width: usize) -> anyhow::Result<TractModel> {
        let bytes = std::fs::read(path).context("Failed to read ONNX regressor")?;
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn predict(&self, matrix: &[f64], rows: usize, width: usize) -> Result<Vec<f64>, ArtifactError> {
        if width != self.width {
            return Err(ArtifactError::Regressor(format!(
                "matrix has {} features, regressor expects {}",
                width, self.width
            )));
        }
        matrix
            .chunks_exact(width.max(1))
            .take(rows)
            .map(|row| self.predict_row(row))
            .collect()
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64, ArtifactError> {
        let data: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, self.width), data)
            .map_err(|e| ArtifactError::Regressor(e.to_string()))?
            .into();

        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ArtifactError::Regressor(format!("{:#}", e)))?;
        let output = result
            .first()
            .ok_or_else(|| ArtifactError::Regressor("no output from model".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| ArtifactError::Regressor(e.to_string()))?;

        // Regressors emit a single value per row, as [1] or [1, 1]
        match view.len() {
            1 => view
                .iter()
                .next()
                .map(|&v| v as f64)
                .ok_or_else(|| ArtifactError::Regressor("empty model output".to_string())),
            n => Err(ArtifactError::Regressor(format!(
                "model returned {} values for one row",
                n
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Tree {
        Tree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left: true,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn test_ensemble_sums_trees() {
        let ensemble = TreeEnsemble {
            base_score: 1.0,
            decision: SplitDecision::LessOrEqual,
            trees: vec![stump(0, 0.5, 10.0, 20.0), stump(1, 0.0, 100.0, 200.0)],
        };
        assert_eq!(ensemble.predict_row(&[0.2, 1.0]), 1.0 + 10.0 + 200.0);
        assert_eq!(ensemble.predict_row(&[0.9, -1.0]), 1.0 + 20.0 + 100.0);
    }

    #[test]
    fn test_threshold_equality_follows_decision() {
        let mut ensemble = TreeEnsemble {
            base_score: 0.0,
            decision: SplitDecision::LessOrEqual,
            trees: vec![stump(0, 0.5, 1.0, 2.0)],
        };
        assert_eq!(ensemble.predict_row(&[0.5]), 1.0);
        ensemble.decision = SplitDecision::LessThan;
        assert_eq!(ensemble.predict_row(&[0.5]), 2.0);
    }

    #[test]
    fn test_nan_uses_default_direction() {
        let ensemble = TreeEnsemble {
            base_score: 0.0,
            decision: SplitDecision::LessThan,
            trees: vec![stump(0, 0.5, 1.0, 2.0)],
        };
        assert_eq!(ensemble.predict_row(&[f64::NAN]), 1.0);
    }

    #[test]
    fn test_malformed_tree_rejected() {
        // Child pointing back at the root would loop forever
        let spec = RegressorSpec::GradientBoostedTrees(TreeEnsemble {
            base_score: 0.0,
            decision: SplitDecision::LessThan,
            trees: vec![Tree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 0,
                        right: 1,
                        default_left: false,
                    },
                    TreeNode::Leaf { value: 1.0 },
                ],
            }],
        });
        assert!(Regressor::from_spec(spec, 1, Path::new(".")).is_err());
    }

    #[test]
    fn test_feature_index_out_of_range() {
        let spec = RegressorSpec::GradientBoostedTrees(TreeEnsemble {
            base_score: 0.0,
            decision: SplitDecision::LessThan,
            trees: vec![stump(3, 0.0, 1.0, 2.0)],
        });
        assert!(Regressor::from_spec(spec, 2, Path::new(".")).is_err());
    }

    #[test]
    fn test_linear_width_checked() {
        let spec = RegressorSpec::Linear(LinearModel {
            intercept: 0.0,
            coefficients: vec![1.0, 2.0],
        });
        assert!(Regressor::from_spec(spec.clone(), 3, Path::new(".")).is_err());
        let regressor = Regressor::from_spec(spec, 2, Path::new(".")).unwrap();
        let out = regressor.predict(&[1.0, 1.0, 2.0, 0.5], 2, 2).unwrap();
        assert_eq!(out, vec![3.0, 3.0]);
    }

    #[test]
    fn test_missing_onnx_file() {
        let dir = tempfile::tempdir().unwrap();
        let spec = RegressorSpec::Onnx {
            path: PathBuf::from("regressor.onnx"),
        };
        let err = Regressor::from_spec(spec, 4, dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Onnx(_)));
    }

    fn onnx_regressor(width: usize) -> (tempfile::TempDir, Regressor) {
        let dir = tempfile::tempdir().unwrap();
        let path = crate::testing::copy_cost_linear_onnx(dir.path());
        let regressor = Regressor::from_spec(RegressorSpec::Onnx { path }, width, dir.path()).unwrap();
        (dir, regressor)
    }

    #[test]
    fn test_onnx_predicts_each_row_in_order() {
        let (_dir, regressor) = onnx_regressor(20);

        let mut matrix = vec![0.0; 3 * 20];
        matrix[0] = 1.0;
        matrix[20 + 1] = 2.0;
        matrix[40 + 19] = -1.0;

        let out = regressor.predict(&matrix, 3, 20).unwrap();
        assert_eq!(out, vec![1.5, 4.5, -19.5]);
    }

    #[test]
    fn test_onnx_single_row() {
        let (_dir, regressor) = onnx_regressor(20);
        let matrix = vec![1.0; 20];
        // 1 + 2 + .. + 20 + 0.5
        assert_eq!(regressor.predict(&matrix, 1, 20).unwrap(), vec![210.5]);
    }

    #[test]
    fn test_onnx_width_mismatch() {
        let (_dir, regressor) = onnx_regressor(20);
        let err = regressor.predict(&[0.0; 19], 1, 19).unwrap_err();
        assert!(matches!(err, ArtifactError::Regressor(_)));
    }

    #[test]
    fn test_spec_json_shape() {
        let spec: RegressorSpec = serde_json::from_str(
            r#"{
                "type": "gradient_boosted_trees",
                "base_score": 2.5,
                "decision": "less_than",
                "trees": [{"nodes": [{"kind": "leaf", "value": 1.5}]}]
            }"#,
        )
        .unwrap();
        let regressor = Regressor::from_spec(spec, 1, Path::new(".")).unwrap();
        assert_eq!(regressor.predict(&[0.0], 1, 1).unwrap(), vec![4.0]);
    }
}
