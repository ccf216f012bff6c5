//! One-hot encoding of categorical columns

use super::ArtifactError;
use serde::{Deserialize, Serialize};

/// What to do with a level the encoder was not fit on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Encode the unseen level as an all-zero block
    #[default]
    Ignore,
    /// Reject the batch
    Error,
}

/// Fitted one-hot encoder.
///
/// Each column contributes one output slot per known category, in the
/// category order stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    pub categories: Vec<Vec<String>>,
    pub handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    pub fn new(columns: Vec<String>, categories: Vec<Vec<String>>, handle_unknown: HandleUnknown) -> Self {
        Self {
            columns,
            categories,
            handle_unknown,
        }
    }

    /// Number of output slots
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub(crate) fn check(&self) -> Result<(), ArtifactError> {
        if self.columns.len() != self.categories.len() {
            return Err(ArtifactError::Incompatible(format!(
                "encoder has {} columns but {} category lists",
                self.columns.len(),
                self.categories.len()
            )));
        }
        if let Some((column, _)) = self
            .columns
            .iter()
            .zip(&self.categories)
            .find(|(_, cats)| cats.is_empty())
        {
            return Err(ArtifactError::Incompatible(format!(
                "encoder column '{}' has no categories",
                column
            )));
        }
        Ok(())
    }

    /// Write the encoding of `value` for column `index` into `out`.
    ///
    /// `out` must be exactly as wide as that column's category list.
    pub fn encode_into(&self, index: usize, value: &str, out: &mut [f64]) -> Result<(), ArtifactError> {
        let categories = &self.categories[index];
        out.fill(0.0);
        match categories.iter().position(|c| c == value) {
            Some(pos) => {
                out[pos] = 1.0;
                Ok(())
            }
            None => match self.handle_unknown {
                HandleUnknown::Ignore => Ok(()),
                HandleUnknown::Error => Err(ArtifactError::UnknownCategory {
                    column: self.columns[index].clone(),
                    value: value.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather(policy: HandleUnknown) -> OneHotEncoder {
        OneHotEncoder::new(
            vec!["Weather_Condition".to_string()],
            vec![vec!["Cloudy".into(), "Snowy".into(), "Sunny".into()]],
            policy,
        )
    }

    #[test]
    fn test_known_level() {
        let enc = weather(HandleUnknown::Ignore);
        let mut out = [9.0; 3];
        enc.encode_into(0, "Snowy", &mut out).unwrap();
        assert_eq!(out, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_level_ignored() {
        let enc = weather(HandleUnknown::Ignore);
        let mut out = [9.0; 3];
        enc.encode_into(0, "Foggy", &mut out).unwrap();
        assert_eq!(out, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_level_rejected() {
        let enc = weather(HandleUnknown::Error);
        let mut out = [0.0; 3];
        let err = enc.encode_into(0, "Foggy", &mut out).unwrap_err();
        assert!(err.to_string().contains("Foggy"));
    }

    #[test]
    fn test_default_policy_is_ignore() {
        let parsed: OneHotEncoder = serde_json::from_str(
            r#"{"columns": ["a"], "categories": [["x"]], "handle_unknown": "ignore"}"#,
        )
        .unwrap();
        assert_eq!(parsed.handle_unknown, HandleUnknown::Ignore);
        assert_eq!(HandleUnknown::default(), HandleUnknown::Ignore);
    }

    #[test]
    fn test_check_rejects_empty_categories() {
        let enc = OneHotEncoder::new(vec!["a".into()], vec![vec![]], HandleUnknown::Ignore);
        assert!(enc.check().is_err());
    }
}
