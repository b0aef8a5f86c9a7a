//! Valves: in-line directed valves and compound hot/cold "big" valves.

use serde::{Deserialize, Serialize};

use super::{Color, Coord, Uid};

/// Variant-specific outputs of a big valve. Output uids name system nodes
/// owned by the valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BigValveKind {
    #[serde(rename_all = "camelCase")]
    Tmv {
        warm_output_uid: Uid,
        cold_output_uid: Uid,
    },
    #[serde(rename_all = "camelCase")]
    Tempering { warm_output_uid: Uid },
    #[serde(rename_all = "camelCase")]
    RpzdHotCold {
        hot_output_uid: Uid,
        cold_output_uid: Uid,
    },
}

impl BigValveKind {
    pub fn output_uids(&self) -> Vec<&str> {
        match self {
            BigValveKind::Tmv {
                warm_output_uid,
                cold_output_uid,
            } => vec![warm_output_uid, cold_output_uid],
            BigValveKind::Tempering { warm_output_uid } => vec![warm_output_uid],
            BigValveKind::RpzdHotCold {
                hot_output_uid,
                cold_output_uid,
            } => vec![hot_output_uid, cold_output_uid],
        }
    }
}

/// A thermostatic mixing, tempering, or hot/cold RPZD valve with two
/// rough-in ports and one or two outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigValveEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub rotation: f64,
    pub cold_rough_in_uid: Uid,
    pub hot_rough_in_uid: Uid,
    pub valve: BigValveKind,
    #[serde(rename = "pipeDistanceMM")]
    pub pipe_distance_mm: f64,
    #[serde(rename = "valveLengthMM")]
    pub valve_length_mm: f64,
    pub height_above_floor_m: f64,
    pub output_temperature_c: f64,
    #[serde(rename = "minInletPressureKPA")]
    pub min_inlet_pressure_kpa: Option<f64>,
    #[serde(rename = "maxInletPressureKPA")]
    pub max_inlet_pressure_kpa: Option<f64>,
    #[serde(rename = "maxHotColdPressureDifferentialPCT")]
    pub max_hot_cold_pressure_differential_pct: Option<f64>,
    #[serde(rename = "minFlowRateLS")]
    pub min_flow_rate_ls: Option<f64>,
    #[serde(rename = "maxFlowRateLS")]
    pub max_flow_rate_ls: Option<f64>,
}

impl BigValveEntity {
    /// All system-node ports of the valve: rough-ins then outputs.
    pub fn port_uids(&self) -> Vec<&str> {
        let mut ports = vec![self.cold_rough_in_uid.as_str(), self.hot_rough_in_uid.as_str()];
        ports.extend(self.valve.output_uids());
        ports
    }
}

/// Variant of an in-line valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectedValveKind {
    CheckValve,
    #[serde(rename_all = "camelCase")]
    IsolationValve {
        is_closed: bool,
        make_isolation_case_on_ring_mains: bool,
    },
    WaterMeter,
    Strainer,
    #[serde(rename_all = "camelCase")]
    RpzdSingle {
        #[serde(rename = "sizeMM")]
        size_mm: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    PrvSingle {
        #[serde(rename = "targetPressureKPA")]
        target_pressure_kpa: Option<f64>,
        #[serde(rename = "sizeMM")]
        size_mm: Option<f64>,
    },
    ReturnPump,
}

/// A valve placed in a pipe run. Flow direction runs away from
/// `source_uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectedValveEntity {
    pub uid: Uid,
    pub parent_uid: Option<Uid>,
    pub center: Coord,
    pub system_uid_option: Option<Uid>,
    pub color: Option<Color>,
    pub source_uid: Uid,
    pub valve: DirectedValveKind,
    pub calculation_height_m: Option<f64>,
}

impl DirectedValveEntity {
    pub fn new(
        uid: impl Into<Uid>,
        source_uid: impl Into<Uid>,
        center: Coord,
        valve: DirectedValveKind,
    ) -> Self {
        Self {
            uid: uid.into(),
            parent_uid: None,
            center,
            system_uid_option: None,
            color: None,
            source_uid: source_uid.into(),
            valve,
            calculation_height_m: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_valve_ports() {
        let valve = BigValveEntity {
            uid: "tmv".into(),
            parent_uid: None,
            center: Coord::default(),
            rotation: 0.0,
            cold_rough_in_uid: "c".into(),
            hot_rough_in_uid: "h".into(),
            valve: BigValveKind::Tmv {
                warm_output_uid: "w".into(),
                cold_output_uid: "co".into(),
            },
            pipe_distance_mm: 150.0,
            valve_length_mm: 300.0,
            height_above_floor_m: 1.0,
            output_temperature_c: 45.0,
            min_inlet_pressure_kpa: None,
            max_inlet_pressure_kpa: None,
            max_hot_cold_pressure_differential_pct: None,
            min_flow_rate_ls: None,
            max_flow_rate_ls: None,
        };
        assert_eq!(valve.port_uids(), vec!["c", "h", "w", "co"]);
        let json = serde_json::to_value(&valve).unwrap();
        assert_eq!(json["valve"]["type"], "TMV");
        assert_eq!(json["valve"]["warmOutputUid"], "w");
    }

    #[test]
    fn directed_valve_kind_wire_names() {
        let kind = DirectedValveKind::IsolationValve {
            is_closed: true,
            make_isolation_case_on_ring_mains: false,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "ISOLATION_VALVE");
        assert_eq!(json["isClosed"], true);

        let prv: DirectedValveKind = serde_json::from_value(serde_json::json!({
            "type": "PRV_SINGLE",
            "targetPressureKPA": 500.0,
            "sizeMM": null,
        }))
        .unwrap();
        assert!(matches!(
            prv,
            DirectedValveKind::PrvSingle {
                target_pressure_kpa: Some(_),
                size_mm: None
            }
        ));
    }
}
