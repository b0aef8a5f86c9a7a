//! Patch semantics for drawing snapshots.
//!
//! The keyed maps of a drawing (levels, entities, shared risers) and the
//! containers around them merge key by key. Everything else is replaced
//! wholesale, including single entities: a patch to an entity carries the
//! whole entity, so changing its `type` can never strand fields of the
//! old variant.
//!
//! A patch is decoded into typed [`Change`]s first, without touching the
//! state. The changes are then swapped in, each handing back the change
//! that reverts it, and only the touched part of the drawing is validated.
//! On failure the reverting changes run in reverse order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::mem;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use drawnet_core::{ChangeSet, DrawingState, Entity, Level, Location, Metadata, ModelError, Uid};

use crate::apply::{invert, merge_into, to_object};
use crate::error::PatchError;
use crate::patch::{MergePolicy, PatchNode, Patchable};

impl Patchable for DrawingState {
    type Changes = ChangeSet;

    fn merge_policy(path: &[&str]) -> MergePolicy {
        match path {
            ["metadata"]
            | ["levels"]
            | ["levels", _]
            | ["levels", _, "entities"]
            | ["shared"] => MergePolicy::Merge,
            _ => MergePolicy::Replace,
        }
    }

    fn changes(&self, fields: &BTreeMap<String, PatchNode>) -> Result<ChangeSet, PatchError> {
        let mut changes = ChangeSet::new();
        for (key, node) in fields {
            match (key.as_str(), node) {
                ("metadata", PatchNode::Fields(_)) => changes.touch_metadata(self),
                ("levels", PatchNode::Fields(levels)) => {
                    for (uid, node) in levels {
                        let PatchNode::Fields(level) = node else {
                            changes.touch_whole_level(self, uid);
                            continue;
                        };
                        changes.touch_level(uid);
                        if let Some(PatchNode::Fields(entities)) = level.get("entities") {
                            for entity in entities.keys() {
                                changes.touch_entity(Location::Level(uid.clone()), entity);
                            }
                        }
                    }
                }
                ("shared", PatchNode::Fields(shared)) => {
                    for uid in shared.keys() {
                        changes.touch_entity(Location::Shared, uid);
                    }
                }
                (key, _) => return Err(unpatchable(key)),
            }
        }
        Ok(changes)
    }

    fn patch_in_place(
        &mut self,
        fields: &BTreeMap<String, PatchNode>,
        changes: &ChangeSet,
    ) -> Result<BTreeMap<String, PatchNode>, PatchError> {
        let (plan, inverse) = decode(self, fields)?;
        let revert: Vec<Change> = plan.into_iter().map(|change| change.write(self)).collect();

        if let Err(errors) = self.validate_changes(changes) {
            let errors = refine_errors(self, changes, errors);
            for change in revert.into_iter().rev() {
                change.write(self);
            }
            log::trace!("patch rejected with {} violations", errors.len());
            return Err(PatchError::Validation(errors));
        }
        Ok(inverse)
    }
}

/// References left dangling by an entity the patch removed are reported
/// as one `Integrity` error per removed entity. Anything else, including a
/// reference to an entity the patch never touched, is kept as is.
fn refine_errors(after: &DrawingState, changes: &ChangeSet, errors: Vec<ModelError>) -> Vec<ModelError> {
    let removed: HashSet<&str> = changes.removed(after).collect();
    let mut dependents: BTreeMap<Uid, Vec<Uid>> = BTreeMap::new();
    let mut rest = Vec::new();
    for error in errors {
        match error {
            ModelError::DanglingReference { uid, target }
            | ModelError::DanglingParent {
                uid,
                parent: target,
            } if removed.contains(target.as_str()) => {
                dependents.entry(target).or_default().push(uid);
            }
            other => rest.push(other),
        }
    }
    rest.extend(dependents.into_iter().map(|(uid, mut dependents)| {
        dependents.sort();
        dependents.dedup();
        ModelError::Integrity { uid, dependents }
    }));
    rest
}

fn unpatchable(key: &str) -> PatchError {
    match key {
        "metadata" | "levels" | "shared" => {
            PatchError::Malformed(format!("{key} must be patched key by key"))
        }
        other => PatchError::Malformed(format!("unknown document key {other}")),
    }
}

// ── Typed changes ────────────────────────────────────────────────────

/// One write to a drawing. Writing a change returns the change that
/// reverts it.
enum Change {
    Metadata(Box<Metadata>),
    Level { uid: Uid, level: Option<Level> },
    Header { uid: Uid, header: Header },
    Entity {
        location: Location,
        uid: Uid,
        entity: Option<Entity>,
    },
}

/// A level without its entities.
struct Header {
    uid: Uid,
    name: String,
    abbreviation: String,
    floor_height_m: f64,
}

impl Header {
    fn swap_into(mut self, level: &mut Level) -> Header {
        mem::swap(&mut self.uid, &mut level.uid);
        mem::swap(&mut self.name, &mut level.name);
        mem::swap(&mut self.abbreviation, &mut level.abbreviation);
        mem::swap(&mut self.floor_height_m, &mut level.floor_height_m);
        self
    }
}

impl From<Level> for Header {
    fn from(level: Level) -> Self {
        Self {
            uid: level.uid,
            name: level.name,
            abbreviation: level.abbreviation,
            floor_height_m: level.floor_height_m,
        }
    }
}

impl Change {
    fn write(self, state: &mut DrawingState) -> Change {
        match self {
            Change::Metadata(metadata) => {
                Change::Metadata(Box::new(mem::replace(&mut state.metadata, *metadata)))
            }
            Change::Level { uid, level } => {
                let old = match level {
                    Some(level) => state.levels.insert(uid.clone(), level),
                    None => state.levels.remove(&uid),
                };
                Change::Level { uid, level: old }
            }
            Change::Header { uid, header } => {
                let old = match state.levels.get_mut(&uid) {
                    Some(level) => header.swap_into(level),
                    None => header,
                };
                Change::Header { uid, header: old }
            }
            Change::Entity {
                location,
                uid,
                entity,
            } => {
                let map = match &location {
                    Location::Level(level) => state.levels.get_mut(level).map(|l| &mut l.entities),
                    Location::Shared => Some(&mut state.shared),
                };
                let old = match (map, entity) {
                    (Some(map), Some(entity)) => map.insert(uid.clone(), entity),
                    (Some(map), None) => map.remove(&uid),
                    // No map to write into; nothing changes.
                    (None, entity) => entity,
                };
                Change::Entity {
                    location,
                    uid,
                    entity: old,
                }
            }
        }
    }
}

// ── Decoding ─────────────────────────────────────────────────────────

type FieldMap = BTreeMap<String, PatchNode>;

/// Turn `fields` into typed changes plus the field patches that undo them.
/// Reads `state` only.
fn decode(state: &DrawingState, fields: &FieldMap) -> Result<(Vec<Change>, FieldMap), PatchError> {
    let mut plan = Vec::new();
    let mut inverse = FieldMap::new();
    for (key, node) in fields {
        let undo = match (key.as_str(), node) {
            ("metadata", PatchNode::Fields(fields)) => decode_metadata(&mut plan, &state.metadata, fields)?,
            ("levels", PatchNode::Fields(levels)) => {
                let mut undo = FieldMap::new();
                for (uid, node) in levels {
                    if let Some(node) = decode_level(&mut plan, state, uid, node)? {
                        undo.insert(uid.clone(), node);
                    }
                }
                undo
            }
            ("shared", PatchNode::Fields(shared)) => {
                decode_entities(&mut plan, &state.shared, &Location::Shared, shared)?
            }
            (key, _) => return Err(unpatchable(key)),
        };
        if !undo.is_empty() {
            inverse.insert(key.clone(), PatchNode::Fields(undo));
        }
    }
    Ok((plan, inverse))
}

fn decode_metadata(plan: &mut Vec<Change>, metadata: &Metadata, fields: &FieldMap) -> Result<FieldMap, PatchError> {
    let mut object = to_object(metadata)?;
    let mut path = vec!["metadata"];
    let undo = invert(&object, fields, &mut path, &DrawingState::merge_policy);
    merge_into(&mut object, fields, &mut path, &DrawingState::merge_policy);
    plan.push(Change::Metadata(Box::new(from_object(object, "metadata")?)));
    Ok(undo)
}

fn decode_level(
    plan: &mut Vec<Change>,
    state: &DrawingState,
    uid: &str,
    node: &PatchNode,
) -> Result<Option<PatchNode>, PatchError> {
    match (state.levels.get(uid), node) {
        (None, PatchNode::Deleted) => Ok(None),
        (Some(old), PatchNode::Deleted) => {
            plan.push(Change::Level {
                uid: uid.to_string(),
                level: None,
            });
            Ok(Some(PatchNode::from(serde_json::to_value(old)?)))
        }
        (_, PatchNode::Value(_)) => Err(PatchError::Malformed(format!("level {uid} must be an object"))),
        (None, PatchNode::Fields(_)) => {
            let level: Level = from_node(node, &format!("level {uid}"))?;
            plan.push(Change::Level {
                uid: uid.to_string(),
                level: Some(level),
            });
            Ok(Some(PatchNode::Deleted))
        }
        (Some(old), PatchNode::Fields(fields)) => {
            let mut undo = FieldMap::new();
            let header: FieldMap = fields
                .iter()
                .filter(|(key, _)| key.as_str() != "entities")
                .map(|(key, node)| (key.clone(), node.clone()))
                .collect();
            if !header.is_empty() {
                undo = decode_header(plan, old, uid, &header)?;
            }
            match fields.get("entities") {
                None => {}
                Some(PatchNode::Fields(entities)) => {
                    let location = Location::Level(uid.to_string());
                    let entities = decode_entities(plan, &old.entities, &location, entities)?;
                    if !entities.is_empty() {
                        undo.insert("entities".to_string(), PatchNode::Fields(entities));
                    }
                }
                Some(_) => {
                    return Err(PatchError::Malformed(format!(
                        "entities of level {uid} must be patched key by key"
                    )))
                }
            }
            Ok((!undo.is_empty()).then_some(PatchNode::Fields(undo)))
        }
    }
}

/// Header fields go through the JSON form of an entity-less copy, so they
/// follow the same merge rules as everything else.
fn decode_header(plan: &mut Vec<Change>, old: &Level, uid: &str, fields: &FieldMap) -> Result<FieldMap, PatchError> {
    let bare = Level::new(
        old.uid.clone(),
        old.name.clone(),
        old.abbreviation.clone(),
        old.floor_height_m,
    );
    let mut object = to_object(&bare)?;
    let mut path = vec!["levels", uid];
    let undo = invert(&object, fields, &mut path, &DrawingState::merge_policy);
    merge_into(&mut object, fields, &mut path, &DrawingState::merge_policy);
    let level: Level = from_object(object, &format!("level {uid}"))?;
    plan.push(Change::Header {
        uid: uid.to_string(),
        header: Header::from(level),
    });
    Ok(undo)
}

fn decode_entities(
    plan: &mut Vec<Change>,
    current: &HashMap<Uid, Entity>,
    location: &Location,
    fields: &FieldMap,
) -> Result<FieldMap, PatchError> {
    let mut undo = FieldMap::new();
    for (uid, node) in fields {
        let entity = match node {
            PatchNode::Deleted => None,
            PatchNode::Fields(_) => Some(from_node::<Entity>(node, &format!("entity {uid}"))?),
            PatchNode::Value(_) => {
                return Err(PatchError::Malformed(format!("entity {uid} must be an object")))
            }
        };
        match (current.get(uid), &entity) {
            (None, None) => continue,
            (None, Some(_)) => undo.insert(uid.clone(), PatchNode::Deleted),
            (Some(old), _) => undo.insert(uid.clone(), PatchNode::from(serde_json::to_value(old)?)),
        };
        plan.push(Change::Entity {
            location: location.clone(),
            uid: uid.clone(),
            entity,
        });
    }
    Ok(undo)
}

fn from_node<T: DeserializeOwned>(node: &PatchNode, what: &str) -> Result<T, PatchError> {
    match node.materialize() {
        Some(Value::Object(object)) => from_object(object, what),
        _ => Err(PatchError::Malformed(format!("{what} must be an object"))),
    }
}

fn from_object<T: DeserializeOwned>(object: Map<String, Value>, what: &str) -> Result<T, PatchError> {
    serde_json::from_value(Value::Object(object)).map_err(|e| PatchError::Malformed(format!("{what}: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use drawnet_core::entity::{
        FittingEntity, FixtureEntity, FlowConfiguration, PipeEntity, RiserEntity,
        SystemNodeEntity,
    };
    use drawnet_core::{Coord, DocumentConfig, NetworkType};

    use super::*;
    use crate::apply::{apply, apply_in_place, apply_with_inverse};
    use crate::patch::Patch;

    pub(crate) fn fitting(uid: &str) -> Entity {
        Entity::Fitting(FittingEntity::new(uid, "cold-water", Coord::default()))
    }

    pub(crate) fn pipe(uid: &str, ends: [&str; 2]) -> Entity {
        Entity::Pipe(PipeEntity::new(
            uid,
            "cold-water",
            NetworkType::Reticulations,
            ends,
        ))
    }

    /// The initial drawing plus a first floor, a basin whose cold rough-in
    /// is piped to fitting `f1`, and riser `r1` serving both floors.
    pub(crate) fn sample() -> DrawingState {
        let mut state = DocumentConfig::default().initial_drawing().unwrap();
        state
            .add_level(Level::new("first", "First Floor", "1", 3.0))
            .unwrap();
        state
            .insert(
                "ground",
                Entity::Fixture(
                    FixtureEntity::new("fx", "basin", Coord::new(10.0, 0.0))
                        .with_rough_in("cold-water", "fx-cold"),
                ),
            )
            .unwrap();
        state
            .insert(
                "ground",
                Entity::SystemNode(SystemNodeEntity::new(
                    "fx-cold",
                    "fx",
                    "cold-water",
                    FlowConfiguration::Input,
                )),
            )
            .unwrap();
        state.insert("ground", fitting("f1")).unwrap();
        state.insert("ground", pipe("p1", ["fx-cold", "f1"])).unwrap();
        state
            .insert_shared(Entity::Riser(RiserEntity::new(
                "r1",
                "cold-water",
                Coord::new(0.0, 0.0),
            )))
            .unwrap();
        state.insert("ground", pipe("pg", ["f1", "r1"])).unwrap();
        state.insert("first", fitting("f2")).unwrap();
        state.insert("first", pipe("pf", ["r1", "f2"])).unwrap();
        state
    }

    fn entity_json(entity: &Entity) -> serde_json::Value {
        serde_json::to_value(entity).unwrap()
    }

    #[test]
    fn merge_positions() {
        let merge = |p: &[&str]| DrawingState::merge_policy(p) == MergePolicy::Merge;
        assert!(merge(&["levels", "ground", "entities"]));
        assert!(merge(&["shared"]));
        assert!(merge(&["metadata"]));
        assert!(!merge(&["levels", "ground", "entities", "f1"]));
        assert!(!merge(&["shared", "r1"]));
        assert!(!merge(&["metadata", "generalInfo"]));
        assert!(!merge(&["levels", "ground", "entities", "p1", "endpointUid"]));
        assert!(!merge(&["levels", "ground", "floorHeightM"]));
    }

    #[test]
    fn floor_height_change_undoes_exactly() {
        let state = sample();
        let patch = Patch::empty().set(&["levels", "ground", "floorHeightM"], json!(15.0));
        let (next, undo) = apply_with_inverse(&state, &patch).unwrap();
        assert_eq!(next.level("ground").unwrap().floor_height_m, 15.0);

        let restored = apply(&next, &undo).unwrap();
        assert_eq!(restored.level("ground").unwrap().floor_height_m, 0.0);
        assert_eq!(restored, state);
    }

    #[test]
    fn deleting_referenced_fitting_is_an_integrity_error() {
        let state = sample();
        let patch = Patch::empty().delete(&["levels", "ground", "entities", "f1"]);
        let err = apply(&state, &patch).unwrap_err();
        assert_eq!(
            err,
            PatchError::Validation(vec![ModelError::Integrity {
                uid: "f1".into(),
                dependents: vec!["p1".into(), "pg".into()],
            }])
        );

        let patch = patch
            .delete(&["levels", "ground", "entities", "p1"])
            .delete(&["levels", "ground", "entities", "pg"]);
        let next = apply(&state, &patch).unwrap();
        assert!(!next.contains("f1"));
        assert!(next.contains("fx-cold"));
    }

    #[test]
    fn deleting_parent_reports_children() {
        let state = sample();
        let patch = Patch::empty().delete(&["levels", "ground", "entities", "fx"]);
        let err = apply(&state, &patch).unwrap_err();
        assert_eq!(
            err,
            PatchError::Validation(vec![ModelError::Integrity {
                uid: "fx".into(),
                dependents: vec!["fx-cold".into()],
            }])
        );
    }

    #[test]
    fn deleting_shared_riser_in_use_fails() {
        let state = sample();
        let patch = Patch::empty().delete(&["shared", "r1"]);
        let err = apply(&state, &patch).unwrap_err();
        assert_eq!(
            err,
            PatchError::Validation(vec![ModelError::Integrity {
                uid: "r1".into(),
                dependents: vec!["pf".into(), "pg".into()],
            }])
        );
    }

    #[test]
    fn pipe_inserted_by_patch_is_traversable() {
        let state = sample();
        let patch = Patch::empty()
            .set(
                &["levels", "ground", "entities", "f3"],
                entity_json(&fitting("f3")),
            )
            .set(
                &["levels", "ground", "entities", "p3"],
                entity_json(&pipe("p3", ["fx-cold", "f3"])),
            );
        let next = apply(&state, &patch).unwrap();
        let from_node: Vec<&str> = next
            .neighbors("fx-cold")
            .unwrap()
            .iter()
            .map(|p| p.uid.as_str())
            .collect();
        assert_eq!(from_node, vec!["p1", "p3"]);
        let from_fitting: Vec<&str> = next
            .neighbors("f3")
            .unwrap()
            .iter()
            .map(|p| p.uid.as_str())
            .collect();
        assert_eq!(from_fitting, vec!["p3"]);
    }

    #[test]
    fn pipe_to_missing_entity_is_rejected() {
        let state = sample();
        let patch = Patch::empty().set(
            &["levels", "ground", "entities", "p9"],
            entity_json(&pipe("p9", ["f1", "ghost"])),
        );
        let err = apply(&state, &patch).unwrap_err();
        assert_eq!(
            err,
            PatchError::Validation(vec![ModelError::DanglingReference {
                uid: "p9".into(),
                target: "ghost".into(),
            }])
        );
    }

    #[test]
    fn deletion_is_terminal_until_reinserted_cleanly() {
        let state = sample();
        let remove = Patch::empty()
            .delete(&["levels", "first", "entities", "f2"])
            .delete(&["levels", "first", "entities", "pf"]);
        let removed = apply(&state, &remove).unwrap();
        assert!(removed.find("f2").is_none());
        assert_eq!(
            removed.neighbors("f2").unwrap_err(),
            ModelError::NotFound("f2".into())
        );

        let reinsert = Patch::empty().set(
            &["levels", "first", "entities", "f2"],
            entity_json(&fitting("f2")),
        );
        let back = apply(&removed, &reinsert).unwrap();
        assert!(back.level("first").unwrap().contains("f2"));
        assert!(back.neighbors("f2").unwrap().is_empty());
    }

    #[test]
    fn reinserting_on_another_level_duplicates_nothing() {
        let state = sample();
        let patch = Patch::empty().set(
            &["levels", "first", "entities", "f1"],
            entity_json(&fitting("f1")),
        );
        let err = apply(&state, &patch).unwrap_err();
        assert_eq!(
            err,
            PatchError::Validation(vec![ModelError::DuplicateId("f1".into())])
        );
    }

    #[test]
    fn partial_general_info_is_malformed() {
        let state = sample();
        let patch = Patch::empty().set(&["metadata", "generalInfo"], json!({"title": "Tower"}));
        assert!(matches!(
            apply(&state, &patch),
            Err(PatchError::Malformed(_))
        ));

        let mut info = serde_json::to_value(&state.metadata.general_info).unwrap();
        info["title"] = json!("Tower");
        let patch = Patch::empty().set(&["metadata", "generalInfo"], info);
        let next = apply(&state, &patch).unwrap();
        assert_eq!(next.metadata.general_info.title, "Tower");
    }

    #[test]
    fn entity_patches_replace_the_whole_entity() {
        let state = sample();
        let patch = Patch::empty().set(
            &["levels", "ground", "entities", "p1", "diameterMM"],
            json!(20.0),
        );
        assert!(matches!(
            apply(&state, &patch),
            Err(PatchError::Malformed(_))
        ));

        let Some(Entity::Pipe(p1)) = state.level("ground").unwrap().get("p1") else {
            panic!("p1 should be a pipe");
        };
        let mut sized = p1.clone();
        sized.diameter_mm = Some(20.0);
        let patch = Patch::empty().set(
            &["levels", "ground", "entities", "p1"],
            entity_json(&Entity::Pipe(sized.clone())),
        );
        let (next, undo) = apply_with_inverse(&state, &patch).unwrap();
        assert_eq!(
            next.level("ground").unwrap().get("p1"),
            Some(&Entity::Pipe(sized))
        );
        assert_eq!(apply(&next, &undo).unwrap(), state);
    }

    #[test]
    fn reference_to_an_untouched_entity_stays_dangling() {
        let state = sample();
        let node = SystemNodeEntity::new("n9", "fx", "cold-water", FlowConfiguration::Input);
        let patch = Patch::empty().set(
            &["levels", "first", "entities", "n9"],
            entity_json(&Entity::SystemNode(node)),
        );
        assert_eq!(
            apply(&state, &patch).unwrap_err(),
            PatchError::Validation(vec![ModelError::DanglingParent {
                uid: "n9".into(),
                parent: "fx".into(),
            }])
        );
    }

    #[test]
    fn parent_rules_apply_to_patched_entities() {
        let state = sample();
        let Some(Entity::Pipe(p1)) = state.level("ground").unwrap().get("p1") else {
            panic!("p1 should be a pipe");
        };
        let mut parented = p1.clone();
        parented.parent_uid = Some("fx".into());
        let patch = Patch::empty().set(
            &["levels", "ground", "entities", "p1"],
            entity_json(&Entity::Pipe(parented)),
        );
        assert_eq!(
            apply(&state, &patch).unwrap_err(),
            PatchError::Validation(vec![ModelError::ParentedPipe {
                uid: "p1".into(),
                parent: "fx".into(),
            }])
        );
    }

    #[test]
    fn rejected_patch_leaves_state_in_place() {
        let mut state = sample();
        let before = state.clone();
        let patch = Patch::empty()
            .set(&["levels", "ground", "floorHeightM"], json!(9.0))
            .set(&["metadata", "generalInfo", "title"], json!("Tower"))
            .delete(&["levels", "ground", "entities", "f1"])
            .set(
                &["levels", "roof"],
                serde_json::to_value(Level::new("roof", "Roof", "R", 6.0)).unwrap(),
            );
        assert!(apply_in_place(&mut state, &patch).is_err());
        assert_eq!(state, before);

        let patch = Patch::empty()
            .set(&["levels", "ground", "floorHeightM"], json!(9.0))
            .delete(&["levels", "ground", "entities", "f1"]);
        assert!(matches!(
            apply_in_place(&mut state, &patch),
            Err(PatchError::Validation(_))
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn inverse_covers_only_touched_positions() {
        let mut state = sample();
        let before = state.clone();
        let patch = Patch::empty()
            .set(&["levels", "first", "name"], json!("Level 1"))
            .set(
                &["levels", "first", "entities", "f3"],
                entity_json(&fitting("f3")),
            )
            .delete(&["levels", "first", "entities", "ghost"]);
        let undo = apply_in_place(&mut state, &patch).unwrap();
        assert_eq!(
            undo.to_value(),
            json!({"levels": {"first": {
                "name": "First Floor",
                "entities": {"f3": {"deleted": true}},
            }}})
        );
        apply_in_place(&mut state, &undo).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn untouched_parts_are_not_revalidated() {
        let mut state = sample();
        state
            .levels
            .get_mut("ground")
            .unwrap()
            .entities
            .insert("px".into(), pipe("px", ["f1", "f1"]));

        let patch = Patch::empty().set(&["levels", "first", "floorHeightM"], json!(4.0));
        let next = apply(&state, &patch).unwrap();
        assert_eq!(next.level("first").unwrap().floor_height_m, 4.0);

        let patch = Patch::empty().set(
            &["levels", "ground", "entities", "px"],
            entity_json(&pipe("px", ["f1", "f1"])),
        );
        assert_eq!(
            apply(&state, &patch).unwrap_err(),
            PatchError::Validation(vec![ModelError::DegeneratePipe("px".into())])
        );
    }

    #[test]
    fn whole_levels_come_and_go() {
        let state = sample();
        let mut roof = Level::new("roof", "Roof", "R", 6.0);
        roof.entities.insert("f8".into(), fitting("f8"));
        roof.entities.insert("pr".into(), pipe("pr", ["f8", "r1"]));
        let patch = Patch::empty().set(&["levels", "roof"], serde_json::to_value(&roof).unwrap());
        let (next, undo) = apply_with_inverse(&state, &patch).unwrap();
        assert_eq!(next.levels_referencing("r1"), vec!["ground", "first", "roof"]);
        assert_eq!(undo.to_value(), json!({"levels": {"roof": {"deleted": true}}}));
        assert_eq!(apply(&next, &undo).unwrap(), state);

        roof.entities.insert("f1".into(), fitting("f1"));
        let patch = Patch::empty().set(&["levels", "roof"], serde_json::to_value(&roof).unwrap());
        assert_eq!(
            apply(&state, &patch).unwrap_err(),
            PatchError::Validation(vec![ModelError::DuplicateId("f1".into())])
        );

        let patch = Patch::empty().delete(&["levels", "first"]);
        let (next, undo) = apply_with_inverse(&state, &patch).unwrap();
        assert!(next.level("first").is_err());
        assert_eq!(next.neighbors("r1").unwrap().len(), 1);
        assert_eq!(apply(&next, &undo).unwrap(), state);
    }

    #[test]
    fn unknown_or_wholesale_roots_are_malformed() {
        let state = sample();
        for patch in [
            Patch::empty().set(&["layers"], json!(1)),
            Patch::empty().delete(&["levels"]),
            Patch::empty().set(&["shared"], json!([])),
            Patch::empty().delete(&["levels", "ground", "entities"]),
            Patch::empty().set(&["levels", "ground", "entities", "f1"], json!(3)),
        ] {
            assert!(matches!(apply(&state, &patch), Err(PatchError::Malformed(_))));
        }
    }
}
