//! Point-like connectable entities: fittings, system nodes, load nodes,
//! and flow sources.

use serde::{Deserialize, Serialize};

use super::{Color, Coord, Uid};

/// A junction where pipes meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FittingEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub system_uid: Uid,
    pub color: Option<Color>,
    pub calculation_height_m: Option<f64>,
}

impl FittingEntity {
    pub fn new(uid: impl Into<Uid>, system_uid: impl Into<Uid>, center: Coord) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            center,
            system_uid: system_uid.into(),
            color: None,
            calculation_height_m: None,
        }
    }
}

/// Role of a system node on its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowConfiguration {
    Input,
    Output,
    Both,
}

/// A typed connection port on a compound entity (fixture, plant, valve).
/// Always owned by its parent and bound to exactly one flow system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNodeEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    /// Position relative to the parent.
    pub center: Coord,
    pub system_uid: Uid,
    pub allow_all_systems: bool,
    pub configuration: FlowConfiguration,
    pub calculation_height_m: Option<f64>,
}

impl SystemNodeEntity {
    pub fn new(
        uid: impl Into<Uid>,
        parent_uid: impl Into<Uid>,
        system_uid: impl Into<Uid>,
        configuration: FlowConfiguration,
    ) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: Some(parent_uid.into()),
            center: Coord::default(),
            system_uid: system_uid.into(),
            allow_all_systems: false,
            configuration,
            calculation_height_m: None,
        }
    }

    /// Builder: set the position relative to the parent.
    pub fn at(mut self, center: Coord) -> Self {
        self.center = center;
        self
    }
}

/// Demand model of a load node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadNodeKind {
    #[serde(rename_all = "camelCase")]
    LoadNode {
        loading_units: f64,
        #[serde(rename = "designFlowRateLS")]
        design_flow_rate_ls: f64,
        #[serde(rename = "continuousFlowLS")]
        continuous_flow_ls: f64,
    },
    #[serde(rename_all = "camelCase")]
    Dwelling {
        dwellings: f64,
        #[serde(rename = "continuousFlowLS")]
        continuous_flow_ls: f64,
    },
}

/// A node that stands in for downstream demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadNodeEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub system_uid_option: Option<Uid>,
    pub color: Option<Color>,
    pub calculation_height_m: Option<f64>,
    pub node: LoadNodeKind,
    #[serde(rename = "minPressureKPA")]
    pub min_pressure_kpa: Option<f64>,
    #[serde(rename = "maxPressureKPA")]
    pub max_pressure_kpa: Option<f64>,
    pub linked_to_uid: Option<Uid>,
}

impl LoadNodeEntity {
    pub fn new(uid: impl Into<Uid>, center: Coord, node: LoadNodeKind) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            center,
            system_uid_option: None,
            color: None,
            calculation_height_m: None,
            node,
            min_pressure_kpa: None,
            max_pressure_kpa: None,
            linked_to_uid: None,
        }
    }
}

/// A supply point feeding a flow system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSourceEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub system_uid: Uid,
    pub height_above_ground_m: Option<f64>,
    pub color: Option<Color>,
    #[serde(rename = "pressureKPA")]
    pub pressure_kpa: Option<f64>,
    pub calculation_height_m: Option<f64>,
}

impl FlowSourceEntity {
    pub fn new(uid: impl Into<Uid>, system_uid: impl Into<Uid>, center: Coord) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            center,
            system_uid: system_uid.into(),
            height_above_ground_m: None,
            color: None,
            pressure_kpa: None,
            calculation_height_m: None,
        }
    }
}
