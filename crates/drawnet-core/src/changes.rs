//! The footprint of an edit: which parts of a document it wrote.
//!
//! A [`ChangeSet`] is built against the state before an edit and then
//! read against the state after it. Presence decides the rest: a touched
//! entity missing afterwards was removed, one missing before was added.
//! Scoped validation and incremental fingerprints both work from it, so
//! their cost follows the size of the edit instead of the document.

use std::collections::BTreeSet;

use crate::drawing::{DrawingState, Location};
use crate::entity::Uid;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    metadata: bool,
    systems_before: BTreeSet<Uid>,
    levels: BTreeSet<Uid>,
    entities: BTreeSet<(Location, Uid)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the metadata as written, remembering which flow systems
    /// `before` defines.
    pub fn touch_metadata(&mut self, before: &DrawingState) {
        if !self.metadata {
            self.metadata = true;
            self.systems_before = before.systems().map(|s| s.uid.clone()).collect();
        }
    }

    /// Mark a level's header (uid, name, abbreviation, floor height) as
    /// written.
    pub fn touch_level(&mut self, uid: &str) {
        self.levels.insert(uid.to_string());
    }

    pub fn touch_entity(&mut self, location: Location, uid: &str) {
        self.entities.insert((location, uid.to_string()));
    }

    /// Mark a level and every entity `state` holds on it.
    pub fn touch_whole_level(&mut self, state: &DrawingState, uid: &str) {
        self.touch_level(uid);
        if let Some(level) = state.levels.get(uid) {
            for key in level.entities.keys() {
                self.touch_entity(Location::Level(uid.to_string()), key);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.metadata && self.levels.is_empty() && self.entities.is_empty()
    }

    pub fn metadata_touched(&self) -> bool {
        self.metadata
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().map(String::as_str)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&Location, &str)> {
        self.entities.iter().map(|(location, uid)| (location, uid.as_str()))
    }

    /// Flow systems defined before the edit that `after` no longer has.
    pub fn removed_systems<'a>(&'a self, after: &'a DrawingState) -> impl Iterator<Item = &'a str> {
        self.systems_before
            .iter()
            .filter(move |uid| !after.metadata.flow_systems.contains(uid))
            .map(String::as_str)
    }

    /// Touched uids that no longer exist anywhere in `after`.
    pub fn removed<'a>(&'a self, after: &'a DrawingState) -> impl Iterator<Item = &'a str> {
        self.entities
            .iter()
            .map(|(_, uid)| uid.as_str())
            .filter(move |uid| !after.contains(uid))
    }
}
