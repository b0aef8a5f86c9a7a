//! Fixtures and gas appliances: compound entities that own system-node
//! ports.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Coord, Uid};

/// The inlet of a fixture for one flow system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoughInRecord {
    /// The system node serving as this rough-in's port.
    pub uid: Uid,
    #[serde(rename = "minPressureKPA")]
    pub min_pressure_kpa: Option<f64>,
    #[serde(rename = "maxPressureKPA")]
    pub max_pressure_kpa: Option<f64>,
    pub loading_units: Option<f64>,
    #[serde(rename = "designFlowRateLS")]
    pub design_flow_rate_ls: Option<f64>,
    #[serde(rename = "continuousFlowLS")]
    pub continuous_flow_ls: Option<f64>,
}

impl RoughInRecord {
    pub fn new(uid: impl Into<Uid>) -> Self {
        Self {
            uid: uid.into(),
            min_pressure_kpa: None,
            max_pressure_kpa: None,
            loading_units: None,
            design_flow_rate_ls: None,
            continuous_flow_ls: None,
        }
    }
}

/// A plumbing fixture (basin, WC, shower, ...).
///
/// `rough_ins` is keyed by flow system uid; `rough_ins_in_order` fixes the
/// display order of those keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub name: String,
    pub abbreviation: String,
    pub rotation: f64,
    pub rough_ins: HashMap<Uid, RoughInRecord>,
    pub rough_ins_in_order: Vec<Uid>,
    #[serde(rename = "pipeDistanceMM")]
    pub pipe_distance_mm: f64,
    pub outlet_above_floor_m: Option<f64>,
    pub warm_temp_c: Option<f64>,
    pub fixture_units: Option<f64>,
    #[serde(rename = "probabilityOfUsagePCT")]
    pub probability_of_usage_pct: Option<f64>,
}

impl FixtureEntity {
    pub fn new(uid: impl Into<Uid>, name: impl Into<String>, center: Coord) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            center,
            name: name.into(),
            abbreviation: String::new(),
            rotation: 0.0,
            rough_ins: HashMap::new(),
            rough_ins_in_order: Vec::new(),
            pipe_distance_mm: 100.0,
            outlet_above_floor_m: None,
            warm_temp_c: None,
            fixture_units: None,
            probability_of_usage_pct: None,
        }
    }

    /// Builder: add a rough-in for `system_uid` served by system node
    /// `node_uid`.
    pub fn with_rough_in(mut self, system_uid: impl Into<Uid>, node_uid: impl Into<Uid>) -> Self {
        let system_uid = system_uid.into();
        if !self.rough_ins_in_order.contains(&system_uid) {
            self.rough_ins_in_order.push(system_uid.clone());
        }
        self.rough_ins
            .insert(system_uid, RoughInRecord::new(node_uid));
        self
    }

    /// Port uids in display order. Rough-ins missing from the order list
    /// follow, sorted by system uid.
    pub fn rough_in_uids(&self) -> Vec<&str> {
        let mut uids: Vec<&str> = self
            .rough_ins_in_order
            .iter()
            .filter_map(|system| self.rough_ins.get(system))
            .map(|r| r.uid.as_str())
            .collect();
        let mut rest: Vec<(&Uid, &RoughInRecord)> = self
            .rough_ins
            .iter()
            .filter(|(system, _)| !self.rough_ins_in_order.contains(system))
            .collect();
        rest.sort_by(|a, b| a.0.cmp(b.0));
        uids.extend(rest.into_iter().map(|(_, r)| r.uid.as_str()));
        uids
    }
}

/// A gas-consuming appliance with a single inlet port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasApplianceEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub name: String,
    pub abbreviation: String,
    pub rotation: f64,
    pub inlet_uid: Uid,
    pub outlet_above_floor_m: f64,
    #[serde(rename = "inletPressureKPA")]
    pub inlet_pressure_kpa: Option<f64>,
    #[serde(rename = "widthMM")]
    pub width_mm: f64,
    #[serde(rename = "heightMM")]
    pub height_mm: f64,
    #[serde(rename = "flowRateMJH")]
    pub flow_rate_mjh: Option<f64>,
    pub diversity: Option<f64>,
}
