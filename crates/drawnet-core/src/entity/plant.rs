//! Plant: pumps, tanks, return systems, and custom equipment.

use serde::{Deserialize, Serialize};

use super::{Coord, Uid};

/// Variant-specific plant parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlantKind {
    #[serde(rename_all = "camelCase")]
    ReturnSystem {
        return_minimum_temperature_c: Option<f64>,
        /// System node the return loop comes back into.
        return_uid: Uid,
        #[serde(rename = "addReturnToPSDFlowRate")]
        add_return_to_psd_flow_rate: bool,
        #[serde(rename = "returnVelocityMS")]
        return_velocity_ms: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Pump {
        #[serde(rename = "pumpPressureKPA")]
        pump_pressure_kpa: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Tank {
        #[serde(rename = "staticPressureKPA")]
        static_pressure_kpa: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Custom {
        #[serde(rename = "pressureLossKPA")]
        pressure_loss_kpa: Option<f64>,
    },
}

/// A piece of plant with one inlet and one outlet port, possibly bridging
/// two flow systems (e.g. a hot water unit fed from cold water).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub inlet_system_uid: Uid,
    pub outlet_system_uid: Uid,
    pub outlet_temperature_c: Option<f64>,
    pub name: String,
    pub rotation: f64,
    pub right_to_left: bool,
    pub height_above_floor_m: f64,
    #[serde(rename = "widthMM")]
    pub width_mm: f64,
    #[serde(rename = "heightMM")]
    pub height_mm: f64,
    pub inlet_uid: Uid,
    pub outlet_uid: Uid,
    pub plant: PlantKind,
}

impl PlantEntity {
    pub fn new(
        uid: impl Into<Uid>,
        inlet: (Uid, Uid),
        outlet: (Uid, Uid),
        center: Coord,
        plant: PlantKind,
    ) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            center,
            inlet_system_uid: inlet.0,
            outlet_system_uid: outlet.0,
            outlet_temperature_c: None,
            name: "Plant".to_string(),
            rotation: 0.0,
            right_to_left: false,
            height_above_floor_m: 0.0,
            width_mm: 1000.0,
            height_mm: 1000.0,
            inlet_uid: inlet.1,
            outlet_uid: outlet.1,
            plant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plant_kind_wire_names() {
        let kind = PlantKind::ReturnSystem {
            return_minimum_temperature_c: Some(55.0),
            return_uid: "ret".into(),
            add_return_to_psd_flow_rate: true,
            return_velocity_ms: None,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "RETURN_SYSTEM");
        assert_eq!(json["addReturnToPSDFlowRate"], true);
        assert_eq!(json["returnUid"], "ret");
    }

    #[test]
    fn plant_constructor_wires_ports() {
        let plant = PlantEntity::new(
            "hwu",
            ("cold-water".into(), "hwu-in".into()),
            ("hot-water".into(), "hwu-out".into()),
            Coord::default(),
            PlantKind::Tank {
                static_pressure_kpa: Some(300.0),
            },
        );
        assert_eq!(plant.inlet_uid, "hwu-in");
        assert_eq!(plant.outlet_system_uid, "hot-water");
    }
}
