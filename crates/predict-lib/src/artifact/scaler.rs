//! Standard scaling of numeric columns

use super::ArtifactError;
use serde::{Deserialize, Serialize};

/// Fitted standard scaler: `(x - mean) / scale` per column.
///
/// A zero scale (constant training column) is treated as 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(columns: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            columns,
            mean,
            scale,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn check(&self) -> Result<(), ArtifactError> {
        if self.mean.len() != self.columns.len() || self.scale.len() != self.columns.len() {
            return Err(ArtifactError::Incompatible(format!(
                "scaler has {} columns, {} means and {} scales",
                self.columns.len(),
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self
            .mean
            .iter()
            .chain(&self.scale)
            .any(|v| !v.is_finite())
        {
            return Err(ArtifactError::Incompatible(
                "scaler parameters must be finite".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn transform(&self, index: usize, value: f64) -> f64 {
        let scale = self.scale[index];
        let scale = if scale == 0.0 { 1.0 } else { scale };
        (value - self.mean[index]) / scale
    }
}
