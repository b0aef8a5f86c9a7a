//! Document metadata: project info, display units, calculation settings,
//! and the flow system registry.
//!
//! Catalog selections and the price table are carried for the external
//! calculation and pricing collaborators; this crate never interprets them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::flow_system::FlowSystems;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralInfo {
    pub title: String,
    pub project_number: String,
    pub project_stage: String,
    pub designer: String,
    pub reviewed: String,
    pub approved: String,
    pub revision: u32,
    pub client: String,
    pub description: String,
}

impl Default for GeneralInfo {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            project_number: String::new(),
            project_stage: String::new(),
            designer: String::new(),
            reviewed: String::new(),
            approved: String::new(),
            revision: 1,
            client: String::new(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementSystem {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeMeasurementSystem {
    #[default]
    Metric,
    Imperial,
    Us,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VelocityMeasurementSystem {
    #[default]
    Metric,
    Imperial,
    AlternativeImperial,
}

/// Display units. Stored values are always metric.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Units {
    pub length_measurement_system: MeasurementSystem,
    pub pressure_measurement_system: MeasurementSystem,
    pub velocity_measurement_system: VelocityMeasurementSystem,
    pub temperature_measurement_system: MeasurementSystem,
    pub volume_measurement_system: VolumeMeasurementSystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RingMainCalculationMethod {
    PsdFlowRateDistributed,
    #[default]
    IsolationCases,
    MaxDistributedAndIsolationCases,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentPressureLossMethod {
    #[default]
    Individually,
    PercentOnTopOfPipe,
}

/// Inputs for the external calculation engine. Standard names (PSD and
/// dwelling methods) are catalog keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationParams {
    pub psd_method: String,
    pub dwelling_method: Option<String>,
    pub ring_main_calculation_method: RingMainCalculationMethod,
    pub pipe_sizing_method: String,
    pub component_pressure_loss_method: ComponentPressureLossMethod,
    #[serde(rename = "pipePressureLossAddOnPCT")]
    pub pipe_pressure_loss_add_on_pct: f64,
    pub ceiling_pipe_height_m: f64,
    pub room_temperature_c: f64,
    #[serde(rename = "windSpeedForHeatLossMS")]
    pub wind_speed_for_heat_loss_ms: f64,
    pub gravitational_acceleration: f64,
}

impl Default for CalculationParams {
    fn default() -> Self {
        Self {
            psd_method: "as35002018LoadingUnits".to_string(),
            dwelling_method: None,
            ring_main_calculation_method: RingMainCalculationMethod::default(),
            pipe_sizing_method: "velocity".to_string(),
            component_pressure_loss_method: ComponentPressureLossMethod::default(),
            pipe_pressure_loss_add_on_pct: 0.0,
            ceiling_pipe_height_m: 3.0,
            room_temperature_c: 20.0,
            wind_speed_for_heat_loss_ms: 0.0,
            gravitational_acceleration: 9.80665,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedMaterialManufacturer {
    pub uid: String,
    pub manufacturer: String,
}

/// Manufacturer selections per catalog section (`pipes`, `prv`, ...).
pub type Catalog = BTreeMap<String, Vec<SelectedMaterialManufacturer>>;

/// The standard, empty catalog sections.
pub fn default_catalog() -> Catalog {
    ["pipes", "backflowValves", "mixingValves", "prv"]
        .into_iter()
        .map(|section| (section.to_string(), Vec::new()))
        .collect()
}

pub fn default_available_fixtures() -> Vec<String> {
    [
        "basin",
        "bath",
        "shower",
        "kitchenSink",
        "wc",
        "washingMachine",
        "laundryTrough",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub general_info: GeneralInfo,
    pub units: Units,
    pub flow_systems: FlowSystems,
    pub calculation_params: CalculationParams,
    pub available_fixtures: Vec<String>,
    #[serde(default = "default_catalog")]
    pub catalog: Catalog,
    #[serde(default = "empty_object")]
    pub price_table: serde_json::Value,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            general_info: GeneralInfo::default(),
            units: Units::default(),
            flow_systems: FlowSystems::standard(),
            calculation_params: CalculationParams::default(),
            available_fixtures: default_available_fixtures(),
            catalog: default_catalog(),
            price_table: empty_object(),
        }
    }
}
