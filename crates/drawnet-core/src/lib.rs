//! Document model for piping and drainage network drawings.
//!
//! A drawing is a graph of engineering entities (pipes, valves, fixtures,
//! fittings, plant, system nodes) organized into floor levels, plus risers
//! shared between levels, together with the flow systems that parameterize
//! each network.
//!
//! The central type is [`DrawingState`], the full snapshot. Entities refer
//! to each other by uid only; [`DrawingState::validate`] checks that every
//! reference resolves and that uids are unique across the document.

pub mod changes;
pub mod config;
pub mod drawing;
pub mod entity;
pub mod error;
pub mod flow_system;
pub mod integrity;
pub mod level;
pub mod metadata;
pub mod snapshot;

pub use changes::ChangeSet;
pub use config::{DiffConfig, DocumentConfig, HistoryConfig};
pub use drawing::{DrawingState, Location, RemovedLevel};
pub use entity::{new_uid, Coord, Entity, EntityType, Uid};
pub use error::{ModelError, Result};
pub use flow_system::{FlowSystem, FlowSystemSpec, FlowSystems, NetworkParams, NetworkType};
pub use level::Level;
pub use metadata::Metadata;
pub use snapshot::Fingerprint;
