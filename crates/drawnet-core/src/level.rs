//! Floor levels: independent entity namespaces stacked by floor height.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, PipeEntity, Uid};

/// One floor of the building.
///
/// `center` and `heightAboveFloorM` of the contained entities are relative
/// to this level, so changing `floor_height_m` moves them implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub entities: HashMap<Uid, Entity>,
    pub floor_height_m: f64,
    pub name: String,
    pub abbreviation: String,
    pub uid: Uid,
}

impl Level {
    pub fn new(
        uid: impl Into<Uid>,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        floor_height_m: f64,
    ) -> Self {
        Self {
            entities: HashMap::new(),
            floor_height_m,
            name: name.into(),
            abbreviation: abbreviation.into(),
            uid: uid.into(),
        }
    }

    pub fn get(&self, uid: &str) -> Option<&Entity> {
        self.entities.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.entities.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn pipes(&self) -> impl Iterator<Item = &PipeEntity> {
        self.entities.values().filter_map(Entity::as_pipe)
    }

    /// Pipes with `uid` as an endpoint, sorted by pipe uid.
    pub fn pipes_touching(&self, uid: &str) -> Vec<&PipeEntity> {
        let mut pipes: Vec<&PipeEntity> = self.pipes().filter(|p| p.touches(uid)).collect();
        pipes.sort_by(|a, b| a.uid.cmp(&b.uid));
        pipes
    }

    /// Entities whose `parentUid` is `uid`, sorted by uid.
    pub fn children_of(&self, uid: &str) -> Vec<&Entity> {
        let mut children: Vec<&Entity> = self
            .entities
            .values()
            .filter(|e| e.parent_uid() == Some(uid))
            .collect();
        children.sort_by(|a, b| a.uid().cmp(b.uid()));
        children
    }

    /// Uids of the entities in this level that reference `uid` in any way,
    /// sorted.
    pub fn dependents_of(&self, uid: &str) -> Vec<Uid> {
        let mut dependents: Vec<Uid> = self
            .entities
            .values()
            .filter(|e| e.uid() != uid && e.references().contains(&uid))
            .map(|e| e.uid().to_string())
            .collect();
        dependents.sort();
        dependents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Coord, FittingEntity};
    use crate::flow_system::NetworkType;

    fn level_with_run() -> Level {
        let mut level = Level::new("ground", "Ground Floor", "G", 0.0);
        for uid in ["f1", "f2", "f3"] {
            level.entities.insert(
                uid.into(),
                Entity::Fitting(FittingEntity::new(uid, "cold-water", Coord::default())),
            );
        }
        for (uid, ends) in [("p2", ["f2", "f3"]), ("p1", ["f1", "f2"])] {
            level.entities.insert(
                uid.into(),
                Entity::Pipe(PipeEntity::new(uid, "cold-water", NetworkType::Reticulations, ends)),
            );
        }
        level
    }

    #[test]
    fn pipes_touching_sorted() {
        let level = level_with_run();
        let uids: Vec<&str> = level.pipes_touching("f2").iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["p1", "p2"]);
        assert!(level.pipes_touching("f9").is_empty());
        assert_eq!(level.pipes().count(), 2);
    }

    #[test]
    fn dependents_include_pipes() {
        let level = level_with_run();
        assert_eq!(level.dependents_of("f1"), vec!["p1".to_string()]);
        assert_eq!(level.dependents_of("p1"), Vec::<Uid>::new());
        assert!(level.children_of("f1").is_empty());
    }

    #[test]
    fn level_wire_format() {
        let level = Level::new("ground", "Ground Floor", "G", 0.0);
        let json = serde_json::to_value(&level).unwrap();
        assert_eq!(json["floorHeightM"], 0.0);
        assert_eq!(json["entities"], serde_json::json!({}));
        assert_eq!(json["abbreviation"], "G");
    }
}
