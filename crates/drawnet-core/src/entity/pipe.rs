//! Pipes: the edges of the network graph.

use serde::{Deserialize, Serialize};

use super::{Color, Uid};
use crate::flow_system::NetworkType;

/// A pipe between two connectable entities.
///
/// `endpoint_uid` is an unordered pair; the two ids must differ. Sizing
/// fields are `None` until resolved by a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub system_uid: Uid,
    pub network: NetworkType,
    pub material: Option<String>,
    pub length_m: Option<f64>,
    #[serde(rename = "maximumVelocityMS")]
    pub maximum_velocity_ms: Option<f64>,
    #[serde(rename = "diameterMM")]
    pub diameter_mm: Option<f64>,
    pub height_above_floor_m: f64,
    #[serde(rename = "gradePCT")]
    pub grade_pct: Option<f64>,
    pub color: Option<Color>,
    pub endpoint_uid: [Uid; 2],
}

impl PipeEntity {
    /// Create an unsized pipe at floor level.
    pub fn new(
        uid: impl Into<Uid>,
        system_uid: impl Into<Uid>,
        network: NetworkType,
        endpoints: [&str; 2],
    ) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            system_uid: system_uid.into(),
            network,
            material: None,
            length_m: None,
            maximum_velocity_ms: None,
            diameter_mm: None,
            height_above_floor_m: 0.0,
            grade_pct: None,
            color: None,
            endpoint_uid: [endpoints[0].to_string(), endpoints[1].to_string()],
        }
    }

    /// Whether `uid` is one of this pipe's endpoints.
    pub fn touches(&self, uid: &str) -> bool {
        self.endpoint_uid.iter().any(|e| e == uid)
    }
}
