//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Service configuration, read from `PREDICT_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the model artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Frontend origin, added to the allowed CORS origins
    #[serde(default)]
    pub frontend_url: Option<String>,

    /// Comma-separated list of allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,

    /// Load both artifacts at startup rather than on first request
    #[serde(default = "default_preload_models")]
    pub preload_models: bool,
}

fn default_api_port() -> u16 {
    8000
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_cors_origins() -> String {
    "http://localhost:8080,http://127.0.0.1:8080".to_string()
}

fn default_preload_models() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            model_dir: default_model_dir(),
            frontend_url: None,
            cors_origins: default_cors_origins(),
            preload_models: default_preload_models(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::build(None)
    }

    /// Load configuration from an explicit variable map instead of the environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::build(Some(vars))
    }

    fn build(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("PREDICT")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid PREDICT_* configuration")
    }

    /// Allowed CORS origins, configured list first, then the frontend URL
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(frontend) = self.frontend_url.as_deref().map(str::trim) {
            if !frontend.is_empty() && !origins.iter().any(|o| o == frontend) {
                origins.push(frontend.to_string());
            }
        }
        origins
    }
}
