//! Recursive partial patches with a deletion marker.
//!
//! A patch mirrors the shape of the document it applies to. At every
//! object position a key is either absent (left alone), `Deleted` (the key
//! is removed), a replacement value, or a nested set of field patches. On
//! the wire the deletion marker is `{"deleted": true}` and everything else
//! is plain JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::PatchError;

/// How a patch object is combined with the object already at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Recurse key by key into the existing object.
    Merge,
    /// Overwrite the existing value wholesale.
    Replace,
}

/// One position of a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum PatchNode {
    /// Remove the key from its parent object.
    Deleted,
    /// A scalar or array replacement.
    Value(Value),
    /// Patches for some keys of an object. Absent keys are left unset.
    Fields(BTreeMap<String, PatchNode>),
}

impl PatchNode {
    /// Whether this is the wire deletion marker.
    pub fn is_marker(value: &Value) -> bool {
        matches!(value, Value::Object(map) if map.len() == 1 && map.get("deleted") == Some(&Value::Bool(true)))
    }

    /// The value this node writes when it lands on a position with
    /// nothing to merge into. Deleted children are dropped.
    pub fn materialize(&self) -> Option<Value> {
        match self {
            PatchNode::Deleted => None,
            PatchNode::Value(v) => Some(v.clone()),
            PatchNode::Fields(fields) => Some(Value::Object(
                fields
                    .iter()
                    .filter_map(|(k, n)| n.materialize().map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// Number of deletion markers and replaced values in the subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            PatchNode::Deleted | PatchNode::Value(_) => 1,
            PatchNode::Fields(fields) => fields.values().map(PatchNode::leaf_count).sum(),
        }
    }
}

impl From<Value> for PatchNode {
    fn from(value: Value) -> Self {
        if PatchNode::is_marker(&value) {
            return PatchNode::Deleted;
        }
        match value {
            Value::Object(map) => PatchNode::Fields(
                map.into_iter()
                    .map(|(k, v)| (k, PatchNode::from(v)))
                    .collect(),
            ),
            other => PatchNode::Value(other),
        }
    }
}

impl From<PatchNode> for Value {
    fn from(node: PatchNode) -> Self {
        match node {
            PatchNode::Deleted => {
                let mut marker = Map::new();
                marker.insert("deleted".to_string(), Value::Bool(true));
                Value::Object(marker)
            }
            PatchNode::Value(v) => v,
            PatchNode::Fields(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, n)| (k, Value::from(n)))
                    .collect(),
            ),
        }
    }
}

/// A document type that patches can be applied to.
///
/// The JSON form of the document defines what a patch means; the differ
/// walks it with [`merge_policy`](Self::merge_policy). Applying works on
/// the typed document in place and visits only the positions a patch
/// names.
pub trait Patchable: Clone + Serialize {
    /// The footprint of a patch on a particular state.
    type Changes;

    /// Policy for the object at `path` (object keys from the root).
    fn merge_policy(path: &[&str]) -> MergePolicy;

    /// What `fields` would touch if applied to `self`. Fails with
    /// `Malformed` when the patch does not fit the document's shape.
    fn changes(&self, fields: &BTreeMap<String, PatchNode>) -> Result<Self::Changes, PatchError>;

    /// Apply `fields`, whose footprint is `changes`, and return the field
    /// patches that undo it. On error `self` is left as it was.
    fn patch_in_place(
        &mut self,
        fields: &BTreeMap<String, PatchNode>,
        changes: &Self::Changes,
    ) -> Result<BTreeMap<String, PatchNode>, PatchError>;
}

/// A patch of a `T` document. The root is always a set of field patches.
pub struct Patch<T> {
    fields: BTreeMap<String, PatchNode>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Patch<T> {
    pub fn new(fields: BTreeMap<String, PatchNode>) -> Self {
        Self {
            fields,
            _doc: PhantomData,
        }
    }

    /// The patch that changes nothing.
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    /// Build from wire JSON. The root must be an object and not the
    /// deletion marker.
    pub fn from_value(value: Value) -> Result<Self, PatchError> {
        match PatchNode::from(value) {
            PatchNode::Fields(fields) => Ok(Self::new(fields)),
            PatchNode::Deleted => Err(PatchError::Malformed(
                "the document root cannot be deleted".to_string(),
            )),
            PatchNode::Value(_) => Err(PatchError::Malformed(
                "patch root must be an object".to_string(),
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from(PatchNode::Fields(self.fields.clone()))
    }

    pub fn fields(&self) -> &BTreeMap<String, PatchNode> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builder: write `value` at `path`, creating intermediate field
    /// patches. An object value becomes nested field patches.
    pub fn set(mut self, path: &[&str], value: Value) -> Self {
        self.put(path, PatchNode::from(value));
        self
    }

    /// Builder: delete the key at `path`.
    pub fn delete(mut self, path: &[&str]) -> Self {
        self.put(path, PatchNode::Deleted);
        self
    }

    /// Write `node` at `path`. A non-object node on the way is replaced by
    /// field patches. An empty path is ignored.
    pub fn put(&mut self, path: &[&str], node: PatchNode) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut fields = &mut self.fields;
        for key in parents {
            let slot = fields
                .entry(key.to_string())
                .or_insert_with(|| PatchNode::Fields(BTreeMap::new()));
            if !matches!(slot, PatchNode::Fields(_)) {
                *slot = PatchNode::Fields(BTreeMap::new());
            }
            fields = match slot {
                PatchNode::Fields(inner) => inner,
                _ => return,
            };
        }
        fields.insert(last.to_string(), node);
    }
}

impl<T> Clone for Patch<T> {
    fn clone(&self) -> Self {
        Self::new(self.fields.clone())
    }
}

impl<T> PartialEq for Patch<T> {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl<T> fmt::Debug for Patch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Patch").field(&self.fields).finish()
    }
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Patch::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn marker_round_trips() {
        let node = PatchNode::from(json!({"deleted": true}));
        assert_eq!(node, PatchNode::Deleted);
        assert_eq!(Value::from(node), json!({"deleted": true}));

        // Only the exact marker object counts.
        let node = PatchNode::from(json!({"deleted": true, "uid": "x"}));
        assert!(matches!(node, PatchNode::Fields(_)));
        let node = PatchNode::from(json!({"deleted": false}));
        assert!(matches!(node, PatchNode::Fields(_)));
    }

    #[test]
    fn objects_become_fields() {
        let node = PatchNode::from(json!({"a": 1, "b": {"c": [1, 2]}, "d": {"deleted": true}}));
        let PatchNode::Fields(fields) = &node else {
            panic!("expected fields");
        };
        assert_eq!(fields["a"], PatchNode::Value(json!(1)));
        assert_eq!(fields["d"], PatchNode::Deleted);
        assert_eq!(node.leaf_count(), 3);
        assert_eq!(node.materialize(), Some(json!({"a": 1, "b": {"c": [1, 2]}})));
    }

    #[test]
    fn builder_paths() {
        let patch: Patch<()> = Patch::empty()
            .set(&["levels", "ground", "floorHeightM"], json!(15.0))
            .delete(&["levels", "ground", "entities", "f1"]);
        assert_eq!(
            patch.to_value(),
            json!({"levels": {"ground": {
                "floorHeightM": 15.0,
                "entities": {"f1": {"deleted": true}},
            }}})
        );

        let patch: Patch<()> = Patch::empty()
            .set(&["a"], json!(1))
            .set(&["a", "b"], json!(2));
        assert_eq!(patch.to_value(), json!({"a": {"b": 2}}));
    }

    #[test]
    fn patch_root_must_be_object() {
        assert!(matches!(
            Patch::<()>::from_value(json!({"deleted": true})),
            Err(PatchError::Malformed(_))
        ));
        assert!(matches!(
            Patch::<()>::from_value(json!([1])),
            Err(PatchError::Malformed(_))
        ));
        assert!(serde_json::from_str::<Patch<()>>("3").is_err());
        let patch: Patch<()> = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }
}
