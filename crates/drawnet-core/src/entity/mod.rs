//! Drawing entities: the typed nodes of the network graph.
//!
//! Every entity carries a globally unique `uid` and an optional
//! `parentUid` naming the entity that owns it. Edges between entities are
//! weak references (uids resolved through the owning level or the shared
//! map), never owning pointers.

pub mod background;
pub mod fixture;
pub mod node;
pub mod pipe;
pub mod plant;
pub mod riser;
pub mod valve;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub use self::background::BackgroundEntity;
pub use self::fixture::{FixtureEntity, GasApplianceEntity, RoughInRecord};
pub use self::node::{
    FittingEntity, FlowConfiguration, FlowSourceEntity, LoadNodeEntity, LoadNodeKind,
    SystemNodeEntity,
};
pub use self::pipe::PipeEntity;
pub use self::plant::{PlantEntity, PlantKind};
pub use self::riser::RiserEntity;
pub use self::valve::{BigValveEntity, BigValveKind, DirectedValveEntity, DirectedValveKind};

/// Entity and level identifier. Uids are opaque strings; freshly created
/// ones are UUID v4.
pub type Uid = String;

/// Generate a fresh uid.
pub fn new_uid() -> Uid {
    uuid::Uuid::new_v4().to_string()
}

/// A 2D position in drawing space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub hex: String,
}

impl Color {
    pub fn new(hex: impl Into<String>) -> Self {
        Self { hex: hex.into() }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// The variant tag of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    BackgroundImage,
    Fitting,
    Pipe,
    BigValve,
    SystemNode,
    Fixture,
    DirectedValve,
    LoadNode,
    Plant,
    Riser,
    FlowSource,
    GasAppliance,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::BackgroundImage => write!(f, "BACKGROUND_IMAGE"),
            EntityType::Fitting => write!(f, "FITTING"),
            EntityType::Pipe => write!(f, "PIPE"),
            EntityType::BigValve => write!(f, "BIG_VALVE"),
            EntityType::SystemNode => write!(f, "SYSTEM_NODE"),
            EntityType::Fixture => write!(f, "FIXTURE"),
            EntityType::DirectedValve => write!(f, "DIRECTED_VALVE"),
            EntityType::LoadNode => write!(f, "LOAD_NODE"),
            EntityType::Plant => write!(f, "PLANT"),
            EntityType::Riser => write!(f, "RISER"),
            EntityType::FlowSource => write!(f, "FLOW_SOURCE"),
            EntityType::GasAppliance => write!(f, "GAS_APPLIANCE"),
        }
    }
}

/// A node in the drawing graph, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Entity {
    BackgroundImage(BackgroundEntity),
    Fitting(FittingEntity),
    Pipe(PipeEntity),
    BigValve(BigValveEntity),
    SystemNode(SystemNodeEntity),
    Fixture(FixtureEntity),
    DirectedValve(DirectedValveEntity),
    LoadNode(LoadNodeEntity),
    Plant(PlantEntity),
    Riser(RiserEntity),
    FlowSource(FlowSourceEntity),
    GasAppliance(GasApplianceEntity),
}

impl Entity {
    /// The entity's unique id.
    pub fn uid(&self) -> &str {
        match self {
            Entity::BackgroundImage(e) => &e.uid,
            Entity::Fitting(e) => &e.uid,
            Entity::Pipe(e) => &e.uid,
            Entity::BigValve(e) => &e.uid,
            Entity::SystemNode(e) => &e.uid,
            Entity::Fixture(e) => &e.uid,
            Entity::DirectedValve(e) => &e.uid,
            Entity::LoadNode(e) => &e.uid,
            Entity::Plant(e) => &e.uid,
            Entity::Riser(e) => &e.uid,
            Entity::FlowSource(e) => &e.uid,
            Entity::GasAppliance(e) => &e.uid,
        }
    }

    /// The owning entity, if any.
    pub fn parent_uid(&self) -> Option<&str> {
        let parent = match self {
            Entity::BackgroundImage(e) => &e.parent_uid,
            Entity::Fitting(e) => &e.parent_uid,
            Entity::Pipe(e) => &e.parent_uid,
            Entity::BigValve(e) => &e.parent_uid,
            Entity::SystemNode(e) => &e.parent_uid,
            Entity::Fixture(e) => &e.parent_uid,
            Entity::DirectedValve(e) => &e.parent_uid,
            Entity::LoadNode(e) => &e.parent_uid,
            Entity::Plant(e) => &e.parent_uid,
            Entity::Riser(e) => &e.parent_uid,
            Entity::FlowSource(e) => &e.parent_uid,
            Entity::GasAppliance(e) => &e.parent_uid,
        };
        parent.as_deref()
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::BackgroundImage(_) => EntityType::BackgroundImage,
            Entity::Fitting(_) => EntityType::Fitting,
            Entity::Pipe(_) => EntityType::Pipe,
            Entity::BigValve(_) => EntityType::BigValve,
            Entity::SystemNode(_) => EntityType::SystemNode,
            Entity::Fixture(_) => EntityType::Fixture,
            Entity::DirectedValve(_) => EntityType::DirectedValve,
            Entity::LoadNode(_) => EntityType::LoadNode,
            Entity::Plant(_) => EntityType::Plant,
            Entity::Riser(_) => EntityType::Riser,
            Entity::FlowSource(_) => EntityType::FlowSource,
            Entity::GasAppliance(_) => EntityType::GasAppliance,
        }
    }

    /// Position of the entity, for the variants that have one.
    pub fn center(&self) -> Option<Coord> {
        match self {
            Entity::Pipe(_) => None,
            Entity::BackgroundImage(e) => Some(e.center),
            Entity::Fitting(e) => Some(e.center),
            Entity::BigValve(e) => Some(e.center),
            Entity::SystemNode(e) => Some(e.center),
            Entity::Fixture(e) => Some(e.center),
            Entity::DirectedValve(e) => Some(e.center),
            Entity::LoadNode(e) => Some(e.center),
            Entity::Plant(e) => Some(e.center),
            Entity::Riser(e) => Some(e.center),
            Entity::FlowSource(e) => Some(e.center),
            Entity::GasAppliance(e) => Some(e.center),
        }
    }

    /// Height computed by the calculation engine, for connectable variants.
    /// `None` both for non-connectable variants and unresolved heights.
    pub fn calculation_height_m(&self) -> Option<f64> {
        match self {
            Entity::Fitting(e) => e.calculation_height_m,
            Entity::SystemNode(e) => e.calculation_height_m,
            Entity::DirectedValve(e) => e.calculation_height_m,
            Entity::LoadNode(e) => e.calculation_height_m,
            Entity::Riser(e) => e.calculation_height_m,
            Entity::FlowSource(e) => e.calculation_height_m,
            Entity::BackgroundImage(_)
            | Entity::Pipe(_)
            | Entity::BigValve(_)
            | Entity::Fixture(_)
            | Entity::Plant(_)
            | Entity::GasAppliance(_) => None,
        }
    }

    /// Whether pipes may terminate on this entity.
    pub fn is_connectable(&self) -> bool {
        match self {
            Entity::Fitting(_)
            | Entity::SystemNode(_)
            | Entity::DirectedValve(_)
            | Entity::LoadNode(_)
            | Entity::Riser(_)
            | Entity::FlowSource(_) => true,
            Entity::BackgroundImage(_)
            | Entity::Pipe(_)
            | Entity::BigValve(_)
            | Entity::Fixture(_)
            | Entity::Plant(_)
            | Entity::GasAppliance(_) => false,
        }
    }

    /// Every uid this entity points at: its parent plus the variant's own
    /// links (pipe endpoints, rough-in ports, valve source, ...).
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.parent_uid().into_iter().collect();
        match self {
            Entity::BackgroundImage(_)
            | Entity::Fitting(_)
            | Entity::SystemNode(_)
            | Entity::Riser(_)
            | Entity::FlowSource(_) => {}
            Entity::Pipe(e) => refs.extend(e.endpoint_uid.iter().map(String::as_str)),
            Entity::BigValve(e) => refs.extend(e.port_uids()),
            Entity::Fixture(e) => refs.extend(e.rough_in_uids()),
            Entity::DirectedValve(e) => refs.push(&e.source_uid),
            Entity::Plant(e) => {
                refs.push(&e.inlet_uid);
                refs.push(&e.outlet_uid);
                if let PlantKind::ReturnSystem { return_uid, .. } = &e.plant {
                    refs.push(return_uid);
                }
            }
            Entity::LoadNode(e) => refs.extend(e.linked_to_uid.as_deref()),
            Entity::GasAppliance(e) => refs.push(&e.inlet_uid),
        }
        refs
    }

    /// Every flow system uid this entity is bound to.
    pub fn system_uids(&self) -> Vec<&str> {
        match self {
            Entity::BackgroundImage(_) | Entity::BigValve(_) | Entity::GasAppliance(_) => vec![],
            Entity::Fitting(e) => vec![&e.system_uid],
            Entity::Pipe(e) => vec![&e.system_uid],
            Entity::SystemNode(e) => vec![&e.system_uid],
            Entity::Fixture(e) => e.rough_ins.keys().map(String::as_str).collect(),
            Entity::DirectedValve(e) => e.system_uid_option.as_deref().into_iter().collect(),
            Entity::LoadNode(e) => e.system_uid_option.as_deref().into_iter().collect(),
            Entity::Plant(e) => vec![&e.inlet_system_uid, &e.outlet_system_uid],
            Entity::Riser(e) => vec![&e.system_uid],
            Entity::FlowSource(e) => vec![&e.system_uid],
        }
    }

    pub fn as_pipe(&self) -> Option<&PipeEntity> {
        match self {
            Entity::Pipe(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_riser(&self) -> Option<&RiserEntity> {
        match self {
            Entity::Riser(r) => Some(r),
            _ => None,
        }
    }

    /// Whether this entity is stored in the document-wide shared map.
    pub fn is_shared(&self) -> bool {
        matches!(self, Entity::Riser(_))
    }

    /// System nodes always hang off a parent; pipes never do.
    pub fn check_parent_rule(&self) -> Result<(), ModelError> {
        match (self, self.parent_uid()) {
            (Entity::SystemNode(e), None) => Err(ModelError::OrphanSystemNode(e.uid.clone())),
            (Entity::Pipe(e), Some(parent)) => Err(ModelError::ParentedPipe {
                uid: e.uid.clone(),
                parent: parent.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
