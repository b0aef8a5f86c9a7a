//! Document invariant checking.
//!
//! Entity operations on [`DrawingState`] keep the document valid one step
//! at a time. Patches arrive as raw data, so after applying one the parts
//! it touched are checked here and every violation is reported.
//! [`DrawingState::validate`] runs the same checks over everything.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::changes::ChangeSet;
use crate::drawing::{DrawingState, Location};
use crate::entity::{Entity, EntityType, PipeEntity, Uid};
use crate::error::ModelError;
use crate::level::Level;

impl DrawingState {
    /// Check every document invariant.
    ///
    /// Errors are reported in a stable order: registry, placement and
    /// uniqueness, then per level (in uid order), then `shared`.
    pub fn validate(&self) -> Result<(), Vec<ModelError>> {
        let mut errors = Vec::new();
        self.check_registry(&mut errors);
        self.check_placement(&mut errors);
        for level in self.levels.values() {
            self.check_level(level, &mut errors);
        }
        self.check_shared(&mut errors);

        finish(errors)
    }

    /// Check what an edit could have broken.
    ///
    /// That is every touched entity still present, the referrers of every
    /// touched entity that is gone, and the users of flow systems the edit
    /// dropped. Level keys and the registry are rechecked when their
    /// headers or the metadata were touched.
    pub fn validate_changes(&self, changes: &ChangeSet) -> Result<(), Vec<ModelError>> {
        let mut errors = Vec::new();
        if changes.metadata_touched() {
            self.check_registry(&mut errors);
        }
        for uid in changes.levels() {
            if let Some((key, level)) = self.levels.get_key_value(uid) {
                check_level_key(key, level, &mut errors);
            }
        }

        let mut recheck: BTreeSet<(Location, Uid)> = BTreeSet::new();
        for (location, uid) in changes.entities() {
            if self.entity_at(location, uid).is_some() {
                recheck.insert((location.clone(), uid.to_string()));
            } else {
                recheck.extend(self.dependents(location, uid));
            }
        }
        for system in changes.removed_systems(self) {
            recheck.extend(self.system_user_locations(system));
        }

        let mut duplicates: BTreeSet<&str> = BTreeSet::new();
        let mut cycles: BTreeSet<&str> = BTreeSet::new();
        for (location, uid) in &recheck {
            let Some(entity) = self.entity_at(location, uid) else {
                continue;
            };
            check_key(uid, entity, &mut errors);
            if self.occurrences(uid) > 1 {
                duplicates.insert(uid.as_str());
            }
            match location {
                Location::Level(level_uid) => {
                    let Some(level) = self.levels.get(level_uid) else {
                        continue;
                    };
                    if entity.is_shared() {
                        errors.push(misplaced(entity, format!("in level {}", level.uid)));
                    }
                    self.check_level_entity(level, entity, &mut errors);
                    cycles.extend(cycle_through(level, uid));
                }
                Location::Shared => {
                    if entity.entity_type() != EntityType::Riser {
                        errors.push(misplaced(entity, "in shared".to_string()));
                    }
                    self.check_shared_entity(entity, &mut errors);
                }
            }
        }
        errors.extend(duplicates.into_iter().map(|uid| ModelError::DuplicateId(uid.to_string())));
        errors.extend(cycles.into_iter().map(|uid| ModelError::ParentCycle(uid.to_string())));

        finish(errors)
    }

    /// Check a level that is not part of the document yet, as if it were
    /// added: its entities must be level-local, new to the document, and
    /// resolve within the level or `shared`.
    pub(crate) fn check_new_level(&self, level: &Level) -> Vec<ModelError> {
        let mut errors = Vec::new();
        for (key, entity) in sorted(&level.entities) {
            check_key(key, entity, &mut errors);
            if entity.is_shared() {
                errors.push(misplaced(entity, format!("in level {}", level.uid)));
            }
            if self.contains(key) {
                errors.push(ModelError::DuplicateId(key.to_string()));
            }
        }
        self.check_level(level, &mut errors);
        errors
    }

    fn check_registry(&self, errors: &mut Vec<ModelError>) {
        let mut seen = HashSet::new();
        for system in self.metadata.flow_systems.iter() {
            if !seen.insert(system.uid.as_str()) {
                errors.push(ModelError::DuplicateSystem(system.uid.clone()));
            }
        }
    }

    fn check_placement(&self, errors: &mut Vec<ModelError>) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for (key, level) in &self.levels {
            check_level_key(key, level, errors);
            for (key, entity) in sorted(&level.entities) {
                *counts.entry(key).or_default() += 1;
                check_key(key, entity, errors);
                if entity.is_shared() {
                    errors.push(misplaced(entity, format!("in level {}", level.uid)));
                }
            }
        }

        for (key, entity) in sorted(&self.shared) {
            *counts.entry(key).or_default() += 1;
            check_key(key, entity, errors);
            if entity.entity_type() != EntityType::Riser {
                errors.push(misplaced(entity, "in shared".to_string()));
            }
        }

        errors.extend(
            counts
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|(uid, _)| ModelError::DuplicateId(uid.to_string())),
        );
    }

    fn check_level(&self, level: &Level, errors: &mut Vec<ModelError>) {
        for (_, entity) in sorted(&level.entities) {
            self.check_level_entity(level, entity, errors);
        }
        check_parent_forest(level, errors);
    }

    /// Parent rule, parent, references and systems of one entity on `level`.
    fn check_level_entity(&self, level: &Level, entity: &Entity, errors: &mut Vec<ModelError>) {
        if let Err(err) = entity.check_parent_rule() {
            errors.push(err);
        }
        if let Some(parent) = entity.parent_uid() {
            if !level.contains(parent) {
                errors.push(ModelError::DanglingParent {
                    uid: entity.uid().to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        match entity {
            Entity::Pipe(pipe) => self.check_pipe(level, pipe, errors),
            _ => {
                for target in entity.references() {
                    if Some(target) == entity.parent_uid() {
                        continue;
                    }
                    if !level.contains(target) && !self.shared.contains_key(target) {
                        errors.push(ModelError::DanglingReference {
                            uid: entity.uid().to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        self.check_entity_systems(entity, errors);
    }

    fn check_pipe(&self, level: &Level, pipe: &PipeEntity, errors: &mut Vec<ModelError>) {
        let [a, b] = &pipe.endpoint_uid;
        if a == b {
            errors.push(ModelError::DegeneratePipe(pipe.uid.clone()));
        }
        for endpoint in &pipe.endpoint_uid {
            if level.contains(endpoint) || self.shared.contains_key(endpoint) {
                continue;
            }
            if self.levels.values().any(|l| l.contains(endpoint)) {
                errors.push(ModelError::CrossLevelEndpoint {
                    pipe: pipe.uid.clone(),
                    endpoint: endpoint.clone(),
                });
            } else {
                errors.push(ModelError::DanglingReference {
                    uid: pipe.uid.clone(),
                    target: endpoint.clone(),
                });
            }
        }
    }

    fn check_shared(&self, errors: &mut Vec<ModelError>) {
        for (_, entity) in sorted(&self.shared) {
            self.check_shared_entity(entity, errors);
        }
    }

    /// Shared entities have no level to hold a parent in.
    fn check_shared_entity(&self, entity: &Entity, errors: &mut Vec<ModelError>) {
        if let Some(parent) = entity.parent_uid() {
            errors.push(ModelError::DanglingParent {
                uid: entity.uid().to_string(),
                parent: parent.to_string(),
            });
        }
        self.check_entity_systems(entity, errors);
    }

    fn check_entity_systems(&self, entity: &Entity, errors: &mut Vec<ModelError>) {
        let mut systems = entity.system_uids();
        systems.sort_unstable();
        for system in systems {
            if !self.metadata.flow_systems.contains(system) {
                errors.push(ModelError::UnknownSystem(system.to_string()));
            }
        }
    }

    fn occurrences(&self, uid: &str) -> usize {
        self.levels.values().filter(|l| l.contains(uid)).count()
            + usize::from(self.shared.contains_key(uid))
    }

    fn system_user_locations(&self, system: &str) -> Vec<(Location, Uid)> {
        let uses = |e: &&Entity| e.system_uids().contains(&system);
        let mut out: Vec<(Location, Uid)> = Vec::new();
        for level in self.levels.values() {
            out.extend(
                level
                    .entities
                    .values()
                    .filter(uses)
                    .map(|e| (Location::Level(level.uid.clone()), e.uid().to_string())),
            );
        }
        out.extend(
            self.shared
                .values()
                .filter(uses)
                .map(|e| (Location::Shared, e.uid().to_string())),
        );
        out
    }
}

fn finish(errors: Vec<ModelError>) -> Result<(), Vec<ModelError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        log::trace!("validation found {} violations", errors.len());
        Err(errors)
    }
}

fn sorted<V>(map: &std::collections::HashMap<String, V>) -> Vec<(&str, &V)> {
    let mut entries: Vec<(&str, &V)> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn check_key(key: &str, entity: &Entity, errors: &mut Vec<ModelError>) {
    if key != entity.uid() {
        errors.push(ModelError::KeyMismatch {
            key: key.to_string(),
            uid: entity.uid().to_string(),
        });
    }
}

fn check_level_key(key: &str, level: &Level, errors: &mut Vec<ModelError>) {
    if key != level.uid {
        errors.push(ModelError::KeyMismatch {
            key: key.to_string(),
            uid: level.uid.clone(),
        });
    }
}

fn misplaced(entity: &Entity, location: String) -> ModelError {
    ModelError::MisplacedEntity {
        uid: entity.uid().to_string(),
        entity_type: entity.entity_type().to_string(),
        location,
    }
}

/// Each parent cycle is reported once, by its smallest member uid.
fn check_parent_forest(level: &Level, errors: &mut Vec<ModelError>) {
    let mut reported: HashSet<&str> = HashSet::new();
    let mut acyclic: HashSet<&str> = HashSet::new();

    for (start, _) in sorted(&level.entities) {
        let mut path: Vec<&str> = Vec::new();
        let mut current = start;
        loop {
            if acyclic.contains(current) {
                break;
            }
            if let Some(pos) = path.iter().position(|p| *p == current) {
                if let Some(min) = path[pos..].iter().copied().min() {
                    if reported.insert(min) {
                        errors.push(ModelError::ParentCycle(min.to_string()));
                    }
                }
                break;
            }
            path.push(current);
            match level.get(current).and_then(Entity::parent_uid) {
                Some(parent) if level.contains(parent) => current = parent,
                _ => {
                    acyclic.extend(path.iter().copied());
                    break;
                }
            }
        }
    }
}

/// The smallest uid of the parent cycle reachable from `start`, if any.
fn cycle_through<'a>(level: &'a Level, start: &'a str) -> Option<&'a str> {
    let mut path: Vec<&str> = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = path.iter().position(|p| *p == current) {
            return path[pos..].iter().copied().min();
        }
        path.push(current);
        match level.get(current).and_then(Entity::parent_uid) {
            Some(parent) if level.contains(parent) => current = parent,
            _ => return None,
        }
    }
}
