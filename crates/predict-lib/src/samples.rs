//! Example request payloads for both models
//!
//! These are the documented example values for each field, one row each.

use crate::models::FeatureRecordSet;
use crate::schema::ModelKind;
use serde_json::json;

pub fn cost_estimation_sample() -> FeatureRecordSet {
    FeatureRecordSet::new()
        .with("Project_Type", json!(["Tunnel"]))
        .with("Planned_Cost", json!([12260784]))
        .with("Planned_Duration", json!([699]))
        .with("Load_Bearing_Capacity", json!([471.2]))
        .with("Temperature", json!([18.54]))
        .with("Humidity", json!([49.88]))
        .with("Weather_Condition", json!(["Snowy"]))
        .with("Air_Quality_Index", json!([210]))
        .with("Energy_Consumption", json!([25202.99]))
        .with("Material_Usage", json!([244.84]))
        .with("Labor_Hours", json!([6602]))
        .with("Accident_Count", json!([8]))
}

pub fn delay_prediction_sample() -> FeatureRecordSet {
    FeatureRecordSet::new()
        .with("timestamp", json!(["2021-01-01 00:00:00"]))
        .with("vehicle_gps_latitude", json!([40.375568]))
        .with("vehicle_gps_longitude", json!([77.014318]))
        .with("fuel_consumption_rate", json!([5.136512]))
        .with("eta_variation_hours", json!([4.998009]))
        .with("traffic_congestion_level", json!([5.927586]))
        .with("warehouse_inventory_level", json!([985.716862]))
        .with("loading_unloading_time", json!([4.951392]))
        .with("handling_equipment_availability", json!([0.481294]))
        .with("order_fulfillment_status", json!([0.761166]))
        .with("weather_condition_severity", json!([0.359066]))
        .with("port_congestion_level", json!([0.289160]))
        .with("shipping_costs", json!([10.503853]))
        .with("supplier_reliability_score", json!([0.986064]))
        .with("lead_time_days", json!([2.128009]))
        .with("historical_demand", json!([100.772854]))
        .with("iot_temperature", json!([18.3]))
        .with("cargo_condition_status", json!([0.777263]))
        .with("route_risk_level", json!([1.182116]))
        .with("customs_clearance_time", json!([0.502006]))
        .with("driver_behavior_score", json!([0.033843]))
        .with("fatigue_monitoring_score", json!([0.978599]))
}

pub fn sample_for(model: ModelKind) -> FeatureRecordSet {
    match model {
        ModelKind::CostEstimation => cost_estimation_sample(),
        ModelKind::DelayPrediction => delay_prediction_sample(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::validate;

    #[test]
    fn test_samples_validate() {
        for model in ModelKind::ALL {
            let validated = validate(&sample_for(model), model.schema()).unwrap();
            assert_eq!(validated.rows, 1);
        }
    }

    #[test]
    fn test_samples_cover_schema_exactly() {
        for model in ModelKind::ALL {
            let sample = sample_for(model);
            assert_eq!(sample.len(), model.schema().fields.len());
        }
    }
}
