//! Flow systems: named fluid networks with per-network sizing parameters.
//!
//! Entities bind to a system by uid. A system referenced by any entity is
//! immutable through this registry; see `DrawingState::update_system`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{new_uid, Color, Uid};
use crate::error::{ModelError, Result};

/// A topological tier within a flow system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkType {
    Risers,
    Reticulations,
    Connections,
}

impl NetworkType {
    pub const ALL: [NetworkType; 3] = [
        NetworkType::Risers,
        NetworkType::Reticulations,
        NetworkType::Connections,
    ];

    /// Parse a wire tag (`RISERS`, `RETICULATIONS`, `CONNECTIONS`).
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "RISERS" => Some(NetworkType::Risers),
            "RETICULATIONS" => Some(NetworkType::Reticulations),
            "CONNECTIONS" => Some(NetworkType::Connections),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Risers => write!(f, "RISERS"),
            NetworkType::Reticulations => write!(f, "RETICULATIONS"),
            NetworkType::Connections => write!(f, "CONNECTIONS"),
        }
    }
}

/// Sizing parameters for one network of a system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    #[serde(rename = "velocityMS")]
    pub velocity_ms: f64,
    pub material: String,
    pub minimum_pipe_size: f64,
    #[serde(rename = "spareCapacityPCT")]
    pub spare_capacity_pct: f64,
}

impl NetworkParams {
    pub fn new(velocity_ms: f64, material: impl Into<String>) -> Self {
        Self {
            velocity_ms,
            material: material.into(),
            minimum_pipe_size: 15.0,
            spare_capacity_pct: 0.0,
        }
    }
}

/// Drainage-specific settings of a flow system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainageProperties {
    pub stack_dedicated_vent: bool,
    pub stack_size_diminish: bool,
    pub max_unvented_length_m: Option<f64>,
}

impl Default for DrainageProperties {
    fn default() -> Self {
        Self {
            stack_dedicated_vent: false,
            stack_size_diminish: false,
            max_unvented_length_m: Some(10.0),
        }
    }
}

/// A named fluid network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSystem {
    pub uid: Uid,
    pub name: String,
    pub temperature: f64,
    pub color: Color,
    pub fluid: String,
    pub has_return_system: bool,
    pub return_is_insulated: bool,
    #[serde(rename = "returnMaxVelocityMS")]
    pub return_max_velocity_ms: f64,
    pub insulation_material: String,
    pub insulation_jacket: String,
    #[serde(rename = "insulationThicknessMM")]
    pub insulation_thickness_mm: f64,
    pub networks: BTreeMap<NetworkType, NetworkParams>,
    #[serde(default)]
    pub drainage_properties: DrainageProperties,
}

/// The caller-supplied part of a new flow system; the registry assigns
/// the uid.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSystemSpec {
    pub name: String,
    pub temperature: f64,
    pub color: Color,
    pub fluid: String,
    pub networks: BTreeMap<NetworkType, NetworkParams>,
}

impl FlowSystemSpec {
    /// A spec with the same parameters on all three networks.
    pub fn uniform(
        name: impl Into<String>,
        fluid: impl Into<String>,
        temperature: f64,
        color: Color,
        params: NetworkParams,
    ) -> Self {
        Self {
            name: name.into(),
            temperature,
            color,
            fluid: fluid.into(),
            networks: NetworkType::ALL
                .iter()
                .map(|n| (*n, params.clone()))
                .collect(),
        }
    }

    pub(crate) fn into_system(self, uid: Uid) -> FlowSystem {
        FlowSystem {
            uid,
            name: self.name,
            temperature: self.temperature,
            color: self.color,
            fluid: self.fluid,
            has_return_system: false,
            return_is_insulated: false,
            return_max_velocity_ms: 1.0,
            insulation_material: "calciumSilicate".to_string(),
            insulation_jacket: "allServiceJacket".to_string(),
            insulation_thickness_mm: 25.0,
            networks: self.networks,
            drainage_properties: DrainageProperties::default(),
        }
    }
}

/// The ordered list of flow systems in a drawing's metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowSystems(Vec<FlowSystem>);

impl FlowSystems {
    pub fn new(systems: Vec<FlowSystem>) -> Self {
        Self(systems)
    }

    /// Register a new system under a freshly generated uid.
    pub fn define(&mut self, spec: FlowSystemSpec) -> Uid {
        let mut uid = new_uid();
        while self.contains(&uid) {
            uid = new_uid();
        }
        self.0.push(spec.into_system(uid.clone()));
        log::debug!("defined flow system {uid}");
        uid
    }

    /// Add a system with a caller-chosen uid.
    pub fn insert(&mut self, system: FlowSystem) -> Result<()> {
        if self.contains(&system.uid) {
            return Err(ModelError::DuplicateSystem(system.uid));
        }
        self.0.push(system);
        Ok(())
    }

    pub fn get(&self, uid: &str) -> Result<&FlowSystem> {
        self.0
            .iter()
            .find(|s| s.uid == uid)
            .ok_or_else(|| ModelError::UnknownSystem(uid.to_string()))
    }

    pub fn get_mut(&mut self, uid: &str) -> Result<&mut FlowSystem> {
        self.0
            .iter_mut()
            .find(|s| s.uid == uid)
            .ok_or_else(|| ModelError::UnknownSystem(uid.to_string()))
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.0.iter().any(|s| s.uid == uid)
    }

    /// Remove a system. Callers are responsible for the in-use check.
    pub(crate) fn remove(&mut self, uid: &str) -> Result<FlowSystem> {
        let index = self
            .0
            .iter()
            .position(|s| s.uid == uid)
            .ok_or_else(|| ModelError::UnknownSystem(uid.to_string()))?;
        Ok(self.0.remove(index))
    }

    /// Pure lookup of one network's sizing parameters.
    pub fn network_params_for(&self, system_uid: &str, network: NetworkType) -> Result<&NetworkParams> {
        let system = self.get(system_uid)?;
        system
            .networks
            .get(&network)
            .ok_or_else(|| ModelError::UnknownNetwork {
                system: system_uid.to_string(),
                network: network.to_string(),
            })
    }

    /// Like [`network_params_for`](Self::network_params_for), taking the
    /// network's wire tag.
    pub fn network_params_by_tag(&self, system_uid: &str, tag: &str) -> Result<&NetworkParams> {
        let network = NetworkType::parse(tag).ok_or_else(|| ModelError::UnknownNetwork {
            system: system_uid.to_string(),
            network: tag.to_string(),
        })?;
        self.network_params_for(system_uid, network)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowSystem> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The standard water systems every new drawing starts with.
    pub fn standard() -> Self {
        Self(vec![cold_water(), hot_water(), warm_water()])
    }
}

fn water_system(
    uid: &str,
    name: &str,
    temperature: f64,
    hex: &str,
    main_velocity_ms: f64,
) -> FlowSystem {
    let mut networks = BTreeMap::new();
    networks.insert(
        NetworkType::Risers,
        NetworkParams::new(main_velocity_ms, "copperTypeB"),
    );
    networks.insert(
        NetworkType::Reticulations,
        NetworkParams::new(main_velocity_ms, "copperTypeB"),
    );
    networks.insert(NetworkType::Connections, NetworkParams::new(3.0, "pexSdr74"));
    FlowSystemSpec {
        name: name.to_string(),
        temperature,
        color: Color::new(hex),
        fluid: "water".to_string(),
        networks,
    }
    .into_system(uid.to_string())
}

pub fn cold_water() -> FlowSystem {
    water_system("cold-water", "Cold Water", 20.0, "#009CE0", 1.5)
}

pub fn hot_water() -> FlowSystem {
    let mut system = water_system("hot-water", "Hot Water", 65.0, "#F44E3B", 1.2);
    system.has_return_system = true;
    system.return_is_insulated = true;
    system
}

pub fn warm_water() -> FlowSystem {
    water_system("warm-water", "Warm Water", 50.0, "#F49000", 1.2)
}
