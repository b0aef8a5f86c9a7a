//! Forward patch generation from two snapshots.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::PatchError;
use crate::patch::{MergePolicy, Patch, PatchNode, Patchable};

/// The paths a diff is allowed to look at.
///
/// `All` admits everything below its position; `Keys` admits only the
/// listed children. A session builds one from the keys its edits touched.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffFilter {
    All,
    Keys(BTreeMap<String, DiffFilter>),
}

impl Default for DiffFilter {
    fn default() -> Self {
        DiffFilter::Keys(BTreeMap::new())
    }
}

impl DiffFilter {
    /// A filter admitting nothing until paths are touched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit everything at and below `path`.
    pub fn touch(&mut self, path: &[&str]) {
        let Some((first, rest)) = path.split_first() else {
            *self = DiffFilter::All;
            return;
        };
        match self {
            DiffFilter::All => {}
            DiffFilter::Keys(children) => children
                .entry(first.to_string())
                .or_default()
                .touch(rest),
        }
    }

    /// Builder form of [`touch`](Self::touch).
    pub fn with(mut self, path: &[&str]) -> Self {
        self.touch(path);
        self
    }

    fn child(&self, key: &str) -> Option<&DiffFilter> {
        match self {
            DiffFilter::All => Some(self),
            DiffFilter::Keys(children) => children.get(key),
        }
    }
}

/// Whether two JSON values are equal, treating numbers within `epsilon` as
/// equal.
pub fn values_equal(a: &Value, b: &Value, epsilon: f64) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() <= epsilon,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y, epsilon))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y, epsilon)))
        }
        _ => a == b,
    }
}

struct Differ<'a> {
    epsilon: f64,
    policy: &'a dyn Fn(&[&str]) -> MergePolicy,
}

impl Differ<'_> {
    fn objects<'v>(
        &self,
        before: &'v Map<String, Value>,
        after: &'v Map<String, Value>,
        path: &mut Vec<&'v str>,
        filter: &DiffFilter,
    ) -> BTreeMap<String, PatchNode> {
        let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
        let mut out = BTreeMap::new();
        for key in keys {
            let Some(filter) = filter.child(key) else {
                continue;
            };
            path.push(key);
            let node = match (before.get(key), after.get(key)) {
                (Some(_), None) => Some(PatchNode::Deleted),
                (None, Some(new)) => Some(PatchNode::from(new.clone())),
                (Some(old), Some(new)) => self.changed(old, new, path, filter),
                (None, None) => None,
            };
            path.pop();
            if let Some(node) = node {
                out.insert(key.clone(), node);
            }
        }
        out
    }

    fn changed<'v>(
        &self,
        old: &'v Value,
        new: &'v Value,
        path: &mut Vec<&'v str>,
        filter: &DiffFilter,
    ) -> Option<PatchNode> {
        match (old, new) {
            (Value::Object(o), Value::Object(n)) if (self.policy)(path.as_slice()) == MergePolicy::Merge => {
                let fields = self.objects(o, n, path, filter);
                (!fields.is_empty()).then_some(PatchNode::Fields(fields))
            }
            _ if values_equal(old, new, self.epsilon) => None,
            _ => Some(PatchNode::from(new.clone())),
        }
    }
}

/// The patch taking `before` to `after`, or `None` if they are equal.
pub fn diff<T: Patchable>(before: &T, after: &T, epsilon: f64) -> Result<Option<Patch<T>>, PatchError> {
    diff_filtered(before, after, &DiffFilter::All, epsilon)
}

/// Like [`diff`], looking only at the paths `filter` admits. Changes
/// outside the filter are not reported.
pub fn diff_filtered<T: Patchable>(
    before: &T,
    after: &T,
    filter: &DiffFilter,
    epsilon: f64,
) -> Result<Option<Patch<T>>, PatchError> {
    let (Value::Object(b), Value::Object(a)) = (serde_json::to_value(before)?, serde_json::to_value(after)?)
    else {
        return Err(PatchError::Malformed(
            "document does not serialize to an object".to_string(),
        ));
    };
    let differ = Differ {
        epsilon,
        policy: &T::merge_policy,
    };
    let fields = differ.objects(&b, &a, &mut Vec::new(), filter);
    log::trace!("diff touched {} top-level keys", fields.len());
    Ok((!fields.is_empty()).then(|| Patch::new(fields)))
}
