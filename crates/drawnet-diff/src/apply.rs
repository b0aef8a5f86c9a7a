//! Patch application and inverse computation.
//!
//! [`merge_into`] and [`invert`] define patch semantics over JSON and are
//! total: any patch can be merged into any object. Documents apply patches
//! through [`Patchable`], which uses these walks only for the small
//! subtrees it cannot patch as typed data.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PatchError;
use crate::patch::{MergePolicy, Patch, PatchNode, Patchable};

/// Merge `fields` into `target` in place.
pub fn merge_into<'p>(
    target: &mut Map<String, Value>,
    fields: &'p BTreeMap<String, PatchNode>,
    path: &mut Vec<&'p str>,
    policy: &dyn Fn(&[&str]) -> MergePolicy,
) {
    for (key, node) in fields {
        path.push(key);
        log::trace!("patch {}", path.join("."));
        match node {
            PatchNode::Deleted => {
                target.remove(key);
            }
            PatchNode::Fields(children) if policy(path.as_slice()) == MergePolicy::Merge => {
                match target.get_mut(key) {
                    Some(Value::Object(existing)) => merge_into(existing, children, path, policy),
                    _ => insert_materialized(target, key, node),
                }
            }
            _ => insert_materialized(target, key, node),
        }
        path.pop();
    }
}

fn insert_materialized(target: &mut Map<String, Value>, key: &str, node: &PatchNode) {
    if let Some(value) = node.materialize() {
        target.insert(key.to_string(), value);
    }
}

/// The field patches that restore `pre` after `fields` has been merged
/// into it.
///
/// Every touched key gets its pre-image: the old value, or `Deleted` if the
/// key did not exist. Deleting a key that was already absent needs no undo.
pub fn invert<'p>(
    pre: &Map<String, Value>,
    fields: &'p BTreeMap<String, PatchNode>,
    path: &mut Vec<&'p str>,
    policy: &dyn Fn(&[&str]) -> MergePolicy,
) -> BTreeMap<String, PatchNode> {
    let mut inverse = BTreeMap::new();
    for (key, node) in fields {
        path.push(key);
        match (pre.get(key), node) {
            (None, PatchNode::Deleted) => {}
            (None, _) => {
                inverse.insert(key.clone(), PatchNode::Deleted);
            }
            (Some(Value::Object(old)), PatchNode::Fields(children))
                if policy(path.as_slice()) == MergePolicy::Merge =>
            {
                inverse.insert(
                    key.clone(),
                    PatchNode::Fields(invert(old, children, path, policy)),
                );
            }
            (Some(old), _) => {
                inverse.insert(key.clone(), PatchNode::from(old.clone()));
            }
        }
        path.pop();
    }
    inverse
}

pub(crate) fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, PatchError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(PatchError::Malformed(
            "value does not serialize to an object".to_string(),
        )),
    }
}

/// Apply `patch` to `state` in place and return its inverse. A rejected
/// patch leaves `state` unchanged.
pub fn apply_in_place<T: Patchable>(state: &mut T, patch: &Patch<T>) -> Result<Patch<T>, PatchError> {
    let changes = state.changes(patch.fields())?;
    state.patch_in_place(patch.fields(), &changes).map(Patch::new)
}

/// Apply `patch` to `state`, producing a new, validated state.
pub fn apply<T: Patchable>(state: &T, patch: &Patch<T>) -> Result<T, PatchError> {
    apply_with_inverse(state, patch).map(|(next, _)| next)
}

/// The patch that undoes `patch` on `state`. Fails if `patch` itself
/// would be rejected.
pub fn inverse<T: Patchable>(state: &T, patch: &Patch<T>) -> Result<Patch<T>, PatchError> {
    apply_with_inverse(state, patch).map(|(_, undo)| undo)
}

/// Apply `patch` and capture its inverse from the same pre-image.
pub fn apply_with_inverse<T: Patchable>(
    state: &T,
    patch: &Patch<T>,
) -> Result<(T, Patch<T>), PatchError> {
    let mut next = state.clone();
    let undo = apply_in_place(&mut next, patch)?;
    Ok((next, undo))
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn key_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(String::from)
    }

    fn leaf_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-100i64..100).prop_map(|n| json!(n)),
            "[a-z]{0,4}".prop_map(Value::String),
            prop::collection::vec(-5i64..5, 0..3).prop_map(|v| json!(v)),
        ]
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        leaf_strategy().prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map(key_strategy(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        })
    }

    fn object_strategy() -> impl Strategy<Value = Map<String, Value>> {
        prop::collection::btree_map(key_strategy(), value_strategy(), 0..5)
            .prop_map(|m| m.into_iter().collect())
    }

    fn node_strategy() -> impl Strategy<Value = PatchNode> {
        let leaf = prop_oneof![
            Just(PatchNode::Deleted),
            leaf_strategy().prop_map(PatchNode::Value),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map(key_strategy(), inner, 0..4).prop_map(PatchNode::Fields)
        })
    }

    fn fields_strategy() -> impl Strategy<Value = BTreeMap<String, PatchNode>> {
        prop::collection::btree_map(key_strategy(), node_strategy(), 0..5)
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Applying a patch and then its inverse restores the original object.
    fn check_undo_is_exact(
        state: Map<String, Value>,
        patch: BTreeMap<String, PatchNode>,
    ) -> Result<(), TestCaseError> {
        let inverse = invert(&state, &patch, &mut Vec::new(), &tests_policy);
        let mut target = state.clone();
        merge_into(&mut target, &patch, &mut Vec::new(), &tests_policy);
        merge_into(&mut target, &inverse, &mut Vec::new(), &tests_policy);
        prop_assert_eq!(target, state);
        Ok(())
    }

    /// The inverse of the inverse, taken on the patched object, redoes
    /// the patch.
    fn check_redo_is_exact(
        state: Map<String, Value>,
        patch: BTreeMap<String, PatchNode>,
    ) -> Result<(), TestCaseError> {
        let inverse = invert(&state, &patch, &mut Vec::new(), &tests_policy);
        let mut after = state.clone();
        merge_into(&mut after, &patch, &mut Vec::new(), &tests_policy);
        let redo = invert(&after, &inverse, &mut Vec::new(), &tests_policy);

        let mut target = after.clone();
        merge_into(&mut target, &inverse, &mut Vec::new(), &tests_policy);
        merge_into(&mut target, &redo, &mut Vec::new(), &tests_policy);
        prop_assert_eq!(target, after);
        Ok(())
    }

    fn tests_policy(path: &[&str]) -> MergePolicy {
        if path.len() % 2 == 1 {
            MergePolicy::Merge
        } else {
            MergePolicy::Replace
        }
    }

    proptest! {
        #[test]
        fn undo_is_exact(state in object_strategy(), patch in fields_strategy()) {
            check_undo_is_exact(state, patch)?;
        }

        #[test]
        fn redo_is_exact(state in object_strategy(), patch in fields_strategy()) {
            check_redo_is_exact(state, patch)?;
        }
    }
}
