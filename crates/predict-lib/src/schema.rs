//! Fixed request schemas and model column layouts
//!
//! Both schemas are compiled in. The model column lists must match, name for
//! name and position for position, the layout the artifacts were fit with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two served models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Construction project actual-cost regressor
    CostEstimation,
    /// Logistics delivery-delay regressor
    DelayPrediction,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::CostEstimation, ModelKind::DelayPrediction];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::CostEstimation => "cost_estimation",
            ModelKind::DelayPrediction => "delay_prediction",
        }
    }

    /// Artifact file name inside the model directory
    pub fn artifact_file_name(&self) -> &'static str {
        match self {
            ModelKind::CostEstimation => "cost_estimation_pipeline.json",
            ModelKind::DelayPrediction => "delay_prediction_pipeline.json",
        }
    }

    /// HTTP route serving this model
    pub fn endpoint(&self) -> &'static str {
        match self {
            ModelKind::CostEstimation => "/predict_actual_cost",
            ModelKind::DelayPrediction => "/predict_time_delay",
        }
    }

    /// Key of the single-entry response mapping
    pub fn response_label(&self) -> &'static str {
        match self {
            ModelKind::CostEstimation => "Predicted Actual Cost of Project (USD)",
            ModelKind::DelayPrediction => "Time Delay (In Hours)",
        }
    }

    pub fn schema(&self) -> &'static Schema {
        match self {
            ModelKind::CostEstimation => &COST_ESTIMATION_SCHEMA,
            ModelKind::DelayPrediction => &DELAY_PREDICTION_SCHEMA,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive type of a caller-supplied field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any JSON number
    Float,
    /// JSON number with no fractional part
    Integer,
    /// Any JSON string
    Categorical,
    /// ISO-8601 date/time string
    Timestamp,
}

/// Preprocessing family of a model input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// One caller-supplied field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// One model input column
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// Request schema plus the column layout fed to the model
#[derive(Debug)]
pub struct Schema {
    pub model: ModelKind,
    pub fields: &'static [FieldSpec],
    pub columns: &'static [ColumnSpec],
    /// Whether calendar features are derived from `timestamp`
    pub derives_time_features: bool,
}

impl Schema {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

const fn num(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Numeric,
    }
}

const fn cat(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Categorical,
    }
}

/// Name of the timestamp field on delay requests
pub const TIMESTAMP_FIELD: &str = "timestamp";

pub static COST_ESTIMATION_SCHEMA: Schema = Schema {
    model: ModelKind::CostEstimation,
    fields: &[
        field("Project_Type", FieldKind::Categorical),
        field("Planned_Cost", FieldKind::Float),
        field("Planned_Duration", FieldKind::Integer),
        field("Load_Bearing_Capacity", FieldKind::Float),
        field("Temperature", FieldKind::Float),
        field("Humidity", FieldKind::Float),
        field("Weather_Condition", FieldKind::Categorical),
        field("Air_Quality_Index", FieldKind::Integer),
        field("Energy_Consumption", FieldKind::Float),
        field("Material_Usage", FieldKind::Float),
        field("Labor_Hours", FieldKind::Integer),
        field("Accident_Count", FieldKind::Integer),
    ],
    columns: &[
        cat("Project_Type"),
        num("Planned_Cost"),
        num("Planned_Duration"),
        num("Load_Bearing_Capacity"),
        num("Temperature"),
        num("Humidity"),
        cat("Weather_Condition"),
        num("Air_Quality_Index"),
        num("Energy_Consumption"),
        num("Material_Usage"),
        num("Labor_Hours"),
        num("Accident_Count"),
    ],
    derives_time_features: false,
};

pub static DELAY_PREDICTION_SCHEMA: Schema = Schema {
    model: ModelKind::DelayPrediction,
    fields: &[
        field(TIMESTAMP_FIELD, FieldKind::Timestamp),
        field("vehicle_gps_latitude", FieldKind::Float),
        field("vehicle_gps_longitude", FieldKind::Float),
        field("fuel_consumption_rate", FieldKind::Float),
        field("eta_variation_hours", FieldKind::Float),
        field("traffic_congestion_level", FieldKind::Float),
        field("warehouse_inventory_level", FieldKind::Float),
        field("loading_unloading_time", FieldKind::Float),
        field("handling_equipment_availability", FieldKind::Float),
        field("order_fulfillment_status", FieldKind::Float),
        field("weather_condition_severity", FieldKind::Float),
        field("port_congestion_level", FieldKind::Float),
        field("shipping_costs", FieldKind::Float),
        field("supplier_reliability_score", FieldKind::Float),
        field("lead_time_days", FieldKind::Float),
        field("historical_demand", FieldKind::Float),
        field("iot_temperature", FieldKind::Float),
        field("cargo_condition_status", FieldKind::Float),
        field("route_risk_level", FieldKind::Float),
        field("customs_clearance_time", FieldKind::Float),
        field("driver_behavior_score", FieldKind::Float),
        field("fatigue_monitoring_score", FieldKind::Float),
    ],
    // customs_clearance_time precedes route_risk_level here, unlike the request
    columns: &[
        num("vehicle_gps_latitude"),
        num("vehicle_gps_longitude"),
        num("fuel_consumption_rate"),
        num("eta_variation_hours"),
        num("traffic_congestion_level"),
        num("warehouse_inventory_level"),
        num("loading_unloading_time"),
        num("handling_equipment_availability"),
        num("weather_condition_severity"),
        num("port_congestion_level"),
        num("shipping_costs"),
        num("supplier_reliability_score"),
        num("lead_time_days"),
        num("historical_demand"),
        num("iot_temperature"),
        num("cargo_condition_status"),
        num("customs_clearance_time"),
        num("route_risk_level"),
        num("driver_behavior_score"),
        num("fatigue_monitoring_score"),
        num("month"),
        num("day"),
        num("day_of_week"),
        num("is_weekend"),
        cat("month_name"),
    ],
    derives_time_features: true,
};
