//! Model health as reported by the liveness and readiness probes
//!
//! Each served model is one component. It starts out pending, becomes
//! healthy once its artifact loads and unhealthy when a load fails. The
//! service is ready when startup has finished and no model has failed.

use crate::schema::ModelKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Artifact loaded
    Healthy,
    /// Not loaded yet; requests will trigger the load
    Degraded,
    /// Last load attempt failed
    Unhealthy,
}

/// Health of one model component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with(status: ComponentStatus, message: String) -> Self {
        Self {
            status,
            message: Some(message),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn pending() -> Self {
        Self::with(ComponentStatus::Degraded, "not loaded yet".to_string())
    }

    pub fn loaded(version: &str) -> Self {
        Self::with(ComponentStatus::Healthy, format!("version {}", version))
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Unhealthy, reason.into())
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status wins
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max_by_key(|status| match status {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    use crate::schema::ModelKind;

    pub const COST_MODEL: &str = "cost_estimation_model";
    pub const DELAY_MODEL: &str = "delay_prediction_model";

    pub fn for_model(model: ModelKind) -> &'static str {
        match model {
            ModelKind::CostEstimation => COST_MODEL,
            ModelKind::DelayPrediction => DELAY_MODEL,
        }
    }
}

/// Shared per-model health plus the startup-complete flag
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    models: Arc<RwLock<HashMap<ModelKind, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// Every served model starts pending and the service not ready
    pub fn new() -> Self {
        let models = ModelKind::ALL
            .into_iter()
            .map(|model| (model, ComponentHealth::pending()))
            .collect();
        Self {
            models: Arc::new(RwLock::new(models)),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Record the outcome of loading `model`'s artifact: its version or a
    /// caller-safe failure reason
    pub async fn record_model_load(&self, model: ModelKind, outcome: Result<String, String>) {
        let health = match outcome {
            Ok(version) => ComponentHealth::loaded(&version),
            Err(reason) => ComponentHealth::failed(reason),
        };
        self.models.write().await.insert(model, health);
    }

    pub async fn model_health(&self, model: ModelKind) -> Option<ComponentHealth> {
        self.models.read().await.get(&model).cloned()
    }

    /// Mark startup as finished (or not)
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components: HashMap<String, ComponentHealth> = self
            .models
            .read()
            .await
            .iter()
            .map(|(model, health)| (components::for_model(*model).to_string(), health.clone()))
            .collect();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Not ready before startup finishes or while any model is failed.
    /// Pending models do not block readiness since the first request loads them.
    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            };
        }

        let models = self.models.read().await;
        let mut failed: Vec<&str> = ModelKind::ALL
            .into_iter()
            .filter(|model| {
                models
                    .get(model)
                    .is_some_and(|h| h.status == ComponentStatus::Unhealthy)
            })
            .map(components::for_model)
            .collect();
        failed.sort_unstable();

        if failed.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Model unavailable: {}", failed.join(", "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_models_start_pending() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components.len(), 2);
        for name in [components::COST_MODEL, components::DELAY_MODEL] {
            let component = &health.components[name];
            assert_eq!(component.status, ComponentStatus::Degraded);
            assert_eq!(component.message.as_deref(), Some("not loaded yet"));
        }
    }

    #[tokio::test]
    async fn test_all_loaded_is_healthy() {
        let registry = HealthRegistry::new();
        for model in ModelKind::ALL {
            registry.record_model_load(model, Ok("v1".to_string())).await;
        }

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_record_model_load() {
        let registry = HealthRegistry::new();
        registry
            .record_model_load(ModelKind::CostEstimation, Ok("v3".to_string()))
            .await;
        registry
            .record_model_load(ModelKind::DelayPrediction, Err("artifact is corrupt".to_string()))
            .await;

        let cost = registry.model_health(ModelKind::CostEstimation).await.unwrap();
        assert_eq!(cost.status, ComponentStatus::Healthy);
        assert_eq!(cost.message.as_deref(), Some("version v3"));

        let health = registry.health().await;
        let delay = &health.components[components::DELAY_MODEL];
        assert_eq!(delay.status, ComponentStatus::Unhealthy);
        assert_eq!(delay.message.as_deref(), Some("artifact is corrupt"));
        assert_eq!(health.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_later_load_recovers_model() {
        let registry = HealthRegistry::new();
        registry
            .record_model_load(ModelKind::CostEstimation, Err("artifact not found".to_string()))
            .await;
        registry
            .record_model_load(ModelKind::CostEstimation, Ok("v2".to_string()))
            .await;

        let cost = registry.model_health(ModelKind::CostEstimation).await.unwrap();
        assert_eq!(cost.status, ComponentStatus::Healthy);
    }

    #[test]
    fn test_component_names() {
        assert_eq!(components::for_model(ModelKind::CostEstimation), components::COST_MODEL);
        assert_eq!(components::for_model(ModelKind::DelayPrediction), components::DELAY_MODEL);
    }

    #[test]
    fn test_health_response_shape() {
        let mut components = HashMap::new();
        components.insert(components::COST_MODEL.to_string(), ComponentHealth::loaded("v1"));
        let status = HealthResponse::compute_status(&components);
        let json = serde_json::to_value(HealthResponse { status, components }).unwrap();

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"][components::COST_MODEL]["message"], "version v1");
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Service not yet initialized"));
    }

    #[tokio::test]
    async fn test_readiness_with_pending_models() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;

        let readiness = registry.readiness().await;
        assert!(readiness.ready);
        assert!(readiness.reason.is_none());
    }

    #[tokio::test]
    async fn test_readiness_names_failed_models() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;
        registry
            .record_model_load(ModelKind::DelayPrediction, Err("artifact not found".to_string()))
            .await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Model unavailable: delay_prediction_model")
        );
    }
}
