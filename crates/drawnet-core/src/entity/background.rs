//! Background images (scaled PDF pages under a level's drawing).

use serde::{Deserialize, Serialize};

use super::{Coord, Rectangle, Uid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub scale_name: String,
    pub scale_factor: f64,
    /// Storage key of the rendered page.
    pub key: String,
    pub filename: String,
    pub crop: Rectangle,
    pub rotation: f64,
    /// Calibration points for scaling.
    pub point_a: Option<Coord>,
    pub point_b: Option<Coord>,
    pub offset: Coord,
    pub page: u32,
    pub total_pages: u32,
}
