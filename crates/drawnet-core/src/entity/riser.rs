//! Risers: vertical, level-spanning connectivity.

use serde::{Deserialize, Serialize};

use super::{Color, Coord, Uid};

/// A riser. Stored once in the document's `shared` map and referenced by
/// pipes on any number of levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiserEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub system_uid: Uid,
    #[serde(rename = "diameterMM")]
    pub diameter_mm: Option<f64>,
    #[serde(rename = "maximumVelocityMS")]
    pub maximum_velocity_ms: Option<f64>,
    pub material: Option<String>,
    pub color: Option<Color>,
    pub temperature_c: Option<f64>,
    pub bottom_height_m: Option<f64>,
    pub top_height_m: Option<f64>,
    pub calculation_height_m: Option<f64>,
}

impl RiserEntity {
    pub fn new(uid: impl Into<Uid>, system_uid: impl Into<Uid>, center: Coord) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            center,
            system_uid: system_uid.into(),
            diameter_mm: None,
            maximum_velocity_ms: None,
            material: None,
            color: None,
            temperature_c: None,
            bottom_height_m: None,
            top_height_m: None,
            calculation_height_m: None,
        }
    }

}
