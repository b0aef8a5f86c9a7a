//! Snapshot wire format and version fingerprints.
//!
//! A fingerprint is the sum, modulo 2^256, of one SHA-256 digest per unit
//! of the document: the metadata, each level header, and each entity keyed
//! by where it is stored. Each unit is hashed over canonical (sorted-key)
//! JSON. The sum does not depend on map order, and an edit can update it
//! by subtracting the digests of the units it rewrote and adding their
//! replacements.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::changes::ChangeSet;
use crate::drawing::{DrawingState, Location};
use crate::entity::Entity;
use crate::error::Result;
use crate::level::Level;
use crate::metadata::Metadata;

/// An order-independent digest of a snapshot, or of part of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint of the whole snapshot.
    pub fn of(state: &DrawingState) -> Result<Self> {
        let mut sum = Self::default();
        sum.add(&metadata_digest(&state.metadata)?);
        for (key, level) in &state.levels {
            sum.add(&header_digest(key, level)?);
            for (uid, entity) in &level.entities {
                sum.add(&entity_digest(&Location::Level(key.clone()), uid, entity)?);
            }
        }
        for (uid, entity) in &state.shared {
            sum.add(&entity_digest(&Location::Shared, uid, entity)?);
        }
        Ok(sum)
    }

    /// The share of `state`'s fingerprint contributed by the units in
    /// `changes`. Units absent from `state` contribute nothing.
    pub fn of_changes(state: &DrawingState, changes: &ChangeSet) -> Result<Self> {
        let mut sum = Self::default();
        if changes.metadata_touched() {
            sum.add(&metadata_digest(&state.metadata)?);
        }
        for key in changes.levels() {
            if let Some(level) = state.levels.get(key) {
                sum.add(&header_digest(key, level)?);
            }
        }
        for (location, uid) in changes.entities() {
            if let Some(entity) = state.entity_at(location, uid) {
                sum.add(&entity_digest(location, uid, entity)?);
            }
        }
        Ok(sum)
    }

    /// Swap the `old` share of this fingerprint for `new`.
    pub fn rebase(&self, old: &Fingerprint, new: &Fingerprint) -> Fingerprint {
        let mut out = *self;
        out.sub(&old.0);
        out.add(&new.0);
        out
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn add(&mut self, digest: &[u8; 32]) {
        let mut carry = 0u16;
        for (byte, other) in self.0.iter_mut().zip(digest).rev() {
            let total = u16::from(*byte) + u16::from(*other) + carry;
            *byte = total as u8;
            carry = total >> 8;
        }
    }

    fn sub(&mut self, digest: &[u8; 32]) {
        let mut borrow = 0i16;
        for (byte, other) in self.0.iter_mut().zip(digest).rev() {
            let mut diff = i16::from(*byte) - i16::from(*other) - borrow;
            borrow = i16::from(diff < 0);
            if diff < 0 {
                diff += 256;
            }
            *byte = diff as u8;
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LevelHeader<'a> {
    uid: &'a str,
    name: &'a str,
    abbreviation: &'a str,
    floor_height_m: f64,
}

fn unit_digest<T: Serialize>(tags: &[&str], value: &T) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    for tag in tags {
        hasher.update(tag.as_bytes());
        hasher.update([0u8]);
    }
    // Through Value so object keys come out sorted.
    let canonical = serde_json::to_value(value)?;
    hasher.update(serde_json::to_vec(&canonical)?);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Ok(out)
}

fn metadata_digest(metadata: &Metadata) -> Result<[u8; 32]> {
    unit_digest(&["metadata"], metadata)
}

fn header_digest(key: &str, level: &Level) -> Result<[u8; 32]> {
    let header = LevelHeader {
        uid: &level.uid,
        name: &level.name,
        abbreviation: &level.abbreviation,
        floor_height_m: level.floor_height_m,
    };
    unit_digest(&["level", key], &header)
}

fn entity_digest(location: &Location, uid: &str, entity: &Entity) -> Result<[u8; 32]> {
    match location {
        Location::Level(level) => unit_digest(&["entity", level, uid], entity),
        Location::Shared => unit_digest(&["shared", uid], entity),
    }
}

impl DrawingState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Version identity of this snapshot. Equal states have equal
    /// fingerprints.
    pub fn fingerprint(&self) -> Result<String> {
        Ok(Fingerprint::of(self)?.to_hex())
    }
}
