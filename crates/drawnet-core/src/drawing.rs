//! The document snapshot and its graph operations.
//!
//! A [`DrawingState`] owns the levels and the shared map. Entity operations
//! check the invariants they can affect before touching anything, so a
//! failed call leaves the state unchanged. The full invariant pass lives
//! in [`integrity`](crate::integrity).

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, PipeEntity, Uid};
use crate::error::{ModelError, Result};
use crate::flow_system::{FlowSystem, FlowSystemSpec, NetworkParams, NetworkType};
use crate::level::Level;
use crate::metadata::Metadata;

/// Where an entity is stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    Level(Uid),
    Shared,
}

/// A level taken out of the stack by [`DrawingState::remove_level`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedLevel {
    pub level: Level,
    /// Shared risers that were referenced by pipes on the removed level.
    /// They stay in `shared`, possibly with no references left.
    pub detached_risers: Vec<Uid>,
}

/// The full materialized document: metadata, levels, and level-spanning
/// shared entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingState {
    pub metadata: Metadata,
    pub levels: BTreeMap<Uid, Level>,
    pub shared: HashMap<Uid, Entity>,
}

impl DrawingState {
    /// An empty drawing with no levels.
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            levels: BTreeMap::new(),
            shared: HashMap::new(),
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────

    pub fn level(&self, uid: &str) -> Result<&Level> {
        self.levels
            .get(uid)
            .ok_or_else(|| ModelError::LevelNotFound(uid.to_string()))
    }

    fn level_mut(&mut self, uid: &str) -> Result<&mut Level> {
        self.levels
            .get_mut(uid)
            .ok_or_else(|| ModelError::LevelNotFound(uid.to_string()))
    }

    /// Every entity in the document: levels in uid order, then `shared`.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.levels
            .values()
            .flat_map(|l| l.entities.values())
            .chain(self.shared.values())
    }

    /// Whether `uid` names an entity anywhere in the document.
    pub fn contains(&self, uid: &str) -> bool {
        self.shared.contains_key(uid) || self.levels.values().any(|l| l.contains(uid))
    }

    /// Locate an entity anywhere in the document.
    pub fn find(&self, uid: &str) -> Option<(Location, &Entity)> {
        self.levels
            .values()
            .find_map(|l| l.get(uid).map(|e| (Location::Level(l.uid.clone()), e)))
            .or_else(|| self.shared.get(uid).map(|e| (Location::Shared, e)))
    }

    /// The entity stored under `uid` at exactly `location`.
    pub fn entity_at(&self, location: &Location, uid: &str) -> Option<&Entity> {
        match location {
            Location::Level(level_uid) => self.levels.get(level_uid).and_then(|l| l.get(uid)),
            Location::Shared => self.shared.get(uid),
        }
    }

    /// Resolve `uid` as seen from `level_uid`: the level's own entities
    /// first, then `shared`.
    pub fn resolve(&self, level_uid: &str, uid: &str) -> Result<&Entity> {
        let level = self.level(level_uid)?;
        level
            .get(uid)
            .or_else(|| self.shared.get(uid))
            .ok_or_else(|| ModelError::NotFound(uid.to_string()))
    }

    /// Pipes with `uid` as an endpoint, sorted by pipe uid. For a shared
    /// riser this spans every level.
    pub fn neighbors(&self, uid: &str) -> Result<Vec<&PipeEntity>> {
        match self.find(uid) {
            Some((Location::Level(level_uid), _)) => Ok(self.level(&level_uid)?.pipes_touching(uid)),
            Some((Location::Shared, _)) => {
                let mut pipes: Vec<&PipeEntity> = self
                    .levels
                    .values()
                    .flat_map(|l| l.pipes_touching(uid))
                    .collect();
                pipes.sort_by(|a, b| a.uid.cmp(&b.uid));
                Ok(pipes)
            }
            None => Err(ModelError::NotFound(uid.to_string())),
        }
    }

    // ── Insertion ────────────────────────────────────────────────────

    /// Insert a level-local entity.
    pub fn insert(&mut self, level_uid: &str, entity: Entity) -> Result<()> {
        if entity.is_shared() {
            return Err(ModelError::MisplacedEntity {
                uid: entity.uid().to_string(),
                entity_type: entity.entity_type().to_string(),
                location: format!("in level {level_uid}"),
            });
        }
        let level = self.level(level_uid)?;
        if self.contains(entity.uid()) {
            return Err(ModelError::DuplicateId(entity.uid().to_string()));
        }
        entity.check_parent_rule()?;
        if let Some(parent) = entity.parent_uid() {
            if !level.contains(parent) {
                return Err(ModelError::DanglingParent {
                    uid: entity.uid().to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        self.check_systems(&entity)?;
        if let Entity::Pipe(pipe) = &entity {
            self.check_endpoints(level_uid, pipe)?;
        }

        log::debug!("insert {} {} into level {level_uid}", entity.entity_type(), entity.uid());
        self.level_mut(level_uid)?
            .entities
            .insert(entity.uid().to_string(), entity);
        Ok(())
    }

    /// Insert a level-spanning entity (a riser) into `shared`.
    pub fn insert_shared(&mut self, entity: Entity) -> Result<()> {
        if !entity.is_shared() {
            return Err(ModelError::MisplacedEntity {
                uid: entity.uid().to_string(),
                entity_type: entity.entity_type().to_string(),
                location: "in shared".to_string(),
            });
        }
        if self.contains(entity.uid()) {
            return Err(ModelError::DuplicateId(entity.uid().to_string()));
        }
        if let Some(parent) = entity.parent_uid() {
            return Err(ModelError::DanglingParent {
                uid: entity.uid().to_string(),
                parent: parent.to_string(),
            });
        }
        self.check_systems(&entity)?;

        log::debug!("insert shared {} {}", entity.entity_type(), entity.uid());
        self.shared.insert(entity.uid().to_string(), entity);
        Ok(())
    }

    fn check_systems(&self, entity: &Entity) -> Result<()> {
        for system in entity.system_uids() {
            if !self.metadata.flow_systems.contains(system) {
                return Err(ModelError::UnknownSystem(system.to_string()));
            }
        }
        Ok(())
    }

    /// Endpoints must be distinct and live in the pipe's level or be
    /// shared risers.
    pub(crate) fn check_endpoints(&self, level_uid: &str, pipe: &PipeEntity) -> Result<()> {
        let [a, b] = &pipe.endpoint_uid;
        if a == b {
            return Err(ModelError::DegeneratePipe(pipe.uid.clone()));
        }
        let level = self.level(level_uid)?;
        for endpoint in &pipe.endpoint_uid {
            if level.contains(endpoint) || self.shared.contains_key(endpoint) {
                continue;
            }
            if self.contains(endpoint) {
                return Err(ModelError::CrossLevelEndpoint {
                    pipe: pipe.uid.clone(),
                    endpoint: endpoint.clone(),
                });
            }
            return Err(ModelError::DanglingReference {
                uid: pipe.uid.clone(),
                target: endpoint.clone(),
            });
        }
        Ok(())
    }

    // ── Removal ──────────────────────────────────────────────────────

    /// Remove one entity. Fails with `Integrity` if anything still
    /// references it.
    pub fn remove(&mut self, level_uid: &str, uid: &str) -> Result<Entity> {
        let mut removed = self.remove_entities(level_uid, &[uid])?;
        removed
            .pop()
            .ok_or_else(|| ModelError::NotFound(uid.to_string()))
    }

    /// Remove several entities atomically. References between members of
    /// the set are allowed; references from outside it are not. Each uid
    /// must live in `level_uid` or in `shared`.
    pub fn remove_entities(&mut self, level_uid: &str, uids: &[&str]) -> Result<Vec<Entity>> {
        let targets = uids
            .iter()
            .map(|uid| Ok((self.locate_from(level_uid, uid)?, uid.to_string())))
            .collect::<Result<Vec<_>>>()?;
        self.remove_located(targets)
    }

    /// Remove an entity with everything that depends on it: children,
    /// connected pipes, and transitively their dependents.
    pub fn remove_cascade(&mut self, level_uid: &str, uid: &str) -> Result<Vec<Entity>> {
        let root = (self.locate_from(level_uid, uid)?, uid.to_string());
        let mut seen: HashSet<Uid> = HashSet::from([uid.to_string()]);
        let mut targets = vec![root.clone()];
        let mut queue = vec![root];
        while let Some((location, current)) = queue.pop() {
            for dependent in self.dependents(&location, &current) {
                if seen.insert(dependent.1.clone()) {
                    targets.push(dependent.clone());
                    queue.push(dependent);
                }
            }
        }
        self.remove_located(targets)
    }

    fn locate_from(&self, level_uid: &str, uid: &str) -> Result<Location> {
        let level = self.level(level_uid)?;
        if level.contains(uid) {
            Ok(Location::Level(level_uid.to_string()))
        } else if self.shared.contains_key(uid) {
            Ok(Location::Shared)
        } else {
            Err(ModelError::NotFound(uid.to_string()))
        }
    }

    /// Entities referencing `uid`, with their locations.
    pub(crate) fn dependents(&self, location: &Location, uid: &str) -> Vec<(Location, Uid)> {
        match location {
            Location::Level(level_uid) => self
                .levels
                .get(level_uid)
                .map(|l| {
                    l.dependents_of(uid)
                        .into_iter()
                        .map(|d| (Location::Level(level_uid.clone()), d))
                        .collect()
                })
                .unwrap_or_default(),
            Location::Shared => {
                let mut out: Vec<(Location, Uid)> = self
                    .levels
                    .values()
                    .flat_map(|l| {
                        l.dependents_of(uid)
                            .into_iter()
                            .map(|d| (Location::Level(l.uid.clone()), d))
                    })
                    .collect();
                let mut shared: Vec<Uid> = self
                    .shared
                    .values()
                    .filter(|e| e.uid() != uid && e.references().contains(&uid))
                    .map(|e| e.uid().to_string())
                    .collect();
                shared.sort();
                out.extend(shared.into_iter().map(|d| (Location::Shared, d)));
                out
            }
        }
    }

    fn remove_located(&mut self, targets: Vec<(Location, Uid)>) -> Result<Vec<Entity>> {
        let doomed: HashSet<&str> = targets.iter().map(|(_, uid)| uid.as_str()).collect();
        for (location, uid) in &targets {
            let dangling: Vec<Uid> = self
                .dependents(location, uid)
                .into_iter()
                .map(|(_, d)| d)
                .filter(|d| !doomed.contains(d.as_str()))
                .collect();
            if !dangling.is_empty() {
                return Err(ModelError::Integrity {
                    uid: uid.clone(),
                    dependents: dangling,
                });
            }
        }

        let mut removed = Vec::with_capacity(targets.len());
        for (location, uid) in targets {
            let entity = match &location {
                Location::Level(level_uid) => self.level_mut(level_uid)?.entities.remove(&uid),
                Location::Shared => self.shared.remove(&uid),
            };
            if let Some(entity) = entity {
                log::debug!("removed {} {}", entity.entity_type(), uid);
                removed.push(entity);
            }
        }
        Ok(removed)
    }

    // ── Floor stack ──────────────────────────────────────────────────

    /// Levels from lowest to highest floor; equal heights order by uid.
    pub fn ordered_levels(&self) -> Vec<&Level> {
        let mut levels: Vec<&Level> = self.levels.values().collect();
        levels.sort_by(|a, b| {
            a.floor_height_m
                .total_cmp(&b.floor_height_m)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        levels
    }

    fn neighbor_level(&self, uid: &str, offset: isize) -> Result<Option<&Level>> {
        let ordered = self.ordered_levels();
        let index = ordered
            .iter()
            .position(|l| l.uid == uid)
            .ok_or_else(|| ModelError::LevelNotFound(uid.to_string()))?;
        Ok(index
            .checked_add_signed(offset)
            .and_then(|i| ordered.get(i).copied()))
    }

    pub fn level_above(&self, uid: &str) -> Result<Option<&Level>> {
        self.neighbor_level(uid, 1)
    }

    pub fn level_below(&self, uid: &str) -> Result<Option<&Level>> {
        self.neighbor_level(uid, -1)
    }

    /// Add a level, with any entities it already holds. Those entities
    /// get the same checks [`insert`](Self::insert) applies, resolved
    /// against the new level and `shared`; the first failure is returned.
    pub fn add_level(&mut self, level: Level) -> Result<()> {
        if self.levels.contains_key(&level.uid) {
            return Err(ModelError::DuplicateLevel(level.uid));
        }
        if let Some(err) = self.check_new_level(&level).into_iter().next() {
            return Err(err);
        }
        log::debug!("added level {} at {} m", level.uid, level.floor_height_m);
        self.levels.insert(level.uid.clone(), level);
        Ok(())
    }

    /// Remove a level and everything on it. Shared risers stay; the ones
    /// that lost references are reported.
    pub fn remove_level(&mut self, uid: &str) -> Result<RemovedLevel> {
        let level = self
            .levels
            .remove(uid)
            .ok_or_else(|| ModelError::LevelNotFound(uid.to_string()))?;
        let mut detached: Vec<Uid> = level
            .pipes()
            .flat_map(|p| p.endpoint_uid.iter())
            .filter(|e| self.shared.contains_key(*e))
            .cloned()
            .collect();
        detached.sort();
        detached.dedup();
        log::debug!(
            "removed level {uid} ({} entities, {} risers detached)",
            level.len(),
            detached.len()
        );
        Ok(RemovedLevel {
            level,
            detached_risers: detached,
        })
    }

    /// Change a level's floor height, returning the previous one. Entity
    /// positions are level-relative and are not touched.
    pub fn set_floor_height(&mut self, uid: &str, floor_height_m: f64) -> Result<f64> {
        let level = self.level_mut(uid)?;
        Ok(std::mem::replace(&mut level.floor_height_m, floor_height_m))
    }

    /// Levels whose pipes touch `riser_uid`, lowest first.
    pub fn levels_referencing(&self, riser_uid: &str) -> Vec<Uid> {
        self.ordered_levels()
            .into_iter()
            .filter(|l| l.pipes().any(|p| p.touches(riser_uid)))
            .map(|l| l.uid.clone())
            .collect()
    }

    // ── Flow systems ─────────────────────────────────────────────────

    pub fn define_system(&mut self, spec: FlowSystemSpec) -> Uid {
        self.metadata.flow_systems.define(spec)
    }

    pub fn system(&self, uid: &str) -> Result<&FlowSystem> {
        self.metadata.flow_systems.get(uid)
    }

    pub fn systems(&self) -> impl Iterator<Item = &FlowSystem> {
        self.metadata.flow_systems.iter()
    }

    pub fn network_params_for(&self, system_uid: &str, network: NetworkType) -> Result<&NetworkParams> {
        self.metadata.flow_systems.network_params_for(system_uid, network)
    }

    /// Uids of the entities bound to a flow system, sorted.
    pub fn system_users(&self, system_uid: &str) -> Vec<Uid> {
        let mut users: Vec<Uid> = self
            .entities()
            .filter(|e| e.system_uids().contains(&system_uid))
            .map(|e| e.uid().to_string())
            .collect();
        users.sort();
        users
    }

    fn ensure_unused(&self, system_uid: &str) -> Result<()> {
        self.system(system_uid)?;
        let users = self.system_users(system_uid);
        if users.is_empty() {
            Ok(())
        } else {
            Err(ModelError::SystemInUse {
                system: system_uid.to_string(),
                users,
            })
        }
    }

    /// Edit a flow system no entity references yet. The uid is kept even
    /// if `edit` changes it.
    pub fn update_system(&mut self, uid: &str, edit: impl FnOnce(&mut FlowSystem)) -> Result<()> {
        self.ensure_unused(uid)?;
        let system = self.metadata.flow_systems.get_mut(uid)?;
        edit(system);
        system.uid = uid.to_string();
        Ok(())
    }

    pub fn remove_system(&mut self, uid: &str) -> Result<FlowSystem> {
        self.ensure_unused(uid)?;
        self.metadata.flow_systems.remove(uid)
    }
}
