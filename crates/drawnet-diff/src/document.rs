//! The editing session: one writer holding the current snapshot.
//!
//! Every state transition (edit, patch, undo, redo) patches the current
//! snapshot in place, so a rejected change leaves the document exactly as
//! it was. The snapshot is copied first only while a reader still holds
//! it. The fingerprint moves with each patch by rehashing just the parts
//! it touched. Each transition is appended to the operation log; replaying
//! the log over the initial snapshot reproduces the current one.

use std::sync::Arc;

use drawnet_core::{DocumentConfig, DrawingState, Fingerprint, ModelError};

use crate::differ::{diff, diff_filtered, DiffFilter};
use crate::error::PatchError;
use crate::history::History;
use crate::operation::Operation;
use crate::patch::{Patch, Patchable};

/// A drawing under edit.
#[derive(Debug)]
pub struct Document {
    state: Arc<DrawingState>,
    version: Fingerprint,
    fingerprint: String,
    history: History,
    log: Vec<Operation>,
    next_id: u64,
    float_epsilon: f64,
}

impl Document {
    /// Open a session on `initial`, which must already be valid.
    pub fn new(initial: DrawingState, config: &DocumentConfig) -> Result<Self, PatchError> {
        initial.validate().map_err(PatchError::Validation)?;
        let version = Fingerprint::of(&initial)?;
        let fingerprint = version.to_hex();
        log::debug!("opened document at {fingerprint}");
        Ok(Self {
            state: Arc::new(initial),
            version,
            fingerprint,
            history: History::new(config.history.max_undo),
            log: Vec::new(),
            next_id: 1,
            float_epsilon: config.diff.float_epsilon,
        })
    }

    /// Open a session on the configured initial drawing.
    pub fn from_config(config: &DocumentConfig) -> Result<Self, PatchError> {
        Self::new(config.initial_drawing()?, config)
    }

    /// A shared handle to the current snapshot. It stays valid, and
    /// unchanged, across later edits.
    pub fn snapshot(&self) -> Arc<DrawingState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    /// Fingerprint of the current snapshot.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Every transition since the session opened, oldest first.
    pub fn operations(&self) -> &[Operation] {
        &self.log
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── Editing ──────────────────────────────────────────────────────

    /// Apply `patch` as a new edit.
    pub fn apply(&mut self, patch: Patch<DrawingState>) -> Result<Operation, PatchError> {
        let op = self.commit(patch)?;
        self.history.record(op.clone());
        log::debug!("accepted op {} ({} undoable)", op.id, self.history.undo_len());
        Ok(op)
    }

    /// Apply an operation received from elsewhere. Its `base`, if any,
    /// must be the current fingerprint. The inverse is recomputed against
    /// the current snapshot.
    pub fn apply_operation(&mut self, op: &Operation) -> Result<Operation, PatchError> {
        if let Some(base) = &op.base {
            if *base != self.fingerprint {
                log::warn!("rejected op {}: stale base {base}", op.id);
                return Err(PatchError::StaleBase {
                    expected: base.clone(),
                    actual: self.fingerprint.clone(),
                });
            }
        }
        self.apply(op.diff.clone())
    }

    /// Run model operations on a draft copy and commit the difference.
    ///
    /// Returns `None` if the draft ends up equal to the current snapshot.
    /// An error from `f` discards the draft.
    pub fn edit(
        &mut self,
        f: impl FnOnce(&mut DrawingState) -> Result<(), ModelError>,
    ) -> Result<Option<Operation>, PatchError> {
        let mut draft = DrawingState::clone(&self.state);
        f(&mut draft)?;
        match diff(self.state.as_ref(), &draft, self.float_epsilon)? {
            Some(patch) => self.apply(patch).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`edit`](Self::edit), committing only changes at paths the
    /// filter admits. Draft changes elsewhere are dropped.
    pub fn edit_within(
        &mut self,
        filter: &DiffFilter,
        f: impl FnOnce(&mut DrawingState) -> Result<(), ModelError>,
    ) -> Result<Option<Operation>, PatchError> {
        let mut draft = DrawingState::clone(&self.state);
        f(&mut draft)?;
        match diff_filtered(self.state.as_ref(), &draft, filter, self.float_epsilon)? {
            Some(patch) => self.apply(patch).map(Some),
            None => Ok(None),
        }
    }

    // ── Undo / redo ──────────────────────────────────────────────────

    /// Undo the most recent edit. Returns `false` if there is none.
    pub fn undo(&mut self) -> Result<bool, PatchError> {
        let Some(op) = self.history.pop_undo() else {
            return Ok(false);
        };
        let base = self.fingerprint.clone();
        if let Err(err) = self.transition(&op.inverse) {
            log::warn!("undo of op {} rejected: {err}", op.id);
            self.history.push_undo(op);
            return Err(err);
        }
        self.append(op.inverted(self.next_id, base));
        log::debug!("undid op {}", op.id);
        self.history.push_redo(op);
        Ok(true)
    }

    /// Redo the most recently undone edit. Returns `false` if there is
    /// none.
    pub fn redo(&mut self) -> Result<bool, PatchError> {
        let Some(op) = self.history.pop_redo() else {
            return Ok(false);
        };
        let base = self.fingerprint.clone();
        if let Err(err) = self.transition(&op.diff) {
            log::warn!("redo of op {} rejected: {err}", op.id);
            self.history.push_redo(op);
            return Err(err);
        }
        self.append(
            Operation::new(self.next_id, op.diff.clone(), op.inverse.clone()).with_base(base),
        );
        log::debug!("redid op {}", op.id);
        self.history.push_undo(op);
        Ok(true)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn commit(&mut self, patch: Patch<DrawingState>) -> Result<Operation, PatchError> {
        let base = self.fingerprint.clone();
        let inverse = self.transition(&patch).map_err(|err| {
            log::warn!("rejected patch: {err}");
            err
        })?;
        let op = Operation::new(self.next_id, patch, inverse).with_base(base);
        self.append(op.clone());
        Ok(op)
    }

    fn transition(&mut self, patch: &Patch<DrawingState>) -> Result<Patch<DrawingState>, PatchError> {
        let mut version = self.version;
        let inverse = advance(Arc::make_mut(&mut self.state), &mut version, patch)?;
        self.version = version;
        self.fingerprint = version.to_hex();
        Ok(inverse)
    }

    fn append(&mut self, logged: Operation) {
        self.next_id = logged.id + 1;
        self.log.push(logged);
    }
}

/// Patch `state` in place and carry `version` along. Returns the inverse;
/// on error neither `state` nor `version` changes.
fn advance(
    state: &mut DrawingState,
    version: &mut Fingerprint,
    patch: &Patch<DrawingState>,
) -> Result<Patch<DrawingState>, PatchError> {
    let changes = state.changes(patch.fields())?;
    let old = Fingerprint::of_changes(state, &changes)?;
    let inverse = state.patch_in_place(patch.fields(), &changes)?;
    match Fingerprint::of_changes(state, &changes) {
        Ok(new) => {
            *version = version.rebase(&old, &new);
            Ok(Patch::new(inverse))
        }
        Err(err) => {
            let revert = state.changes(&inverse)?;
            state.patch_in_place(&inverse, &revert)?;
            Err(err.into())
        }
    }
}

/// Rebuild a snapshot from `initial` and an operation log, validating each
/// step. Operations carrying a `base` must match the snapshot they land on.
pub fn replay(initial: &DrawingState, operations: &[Operation]) -> Result<DrawingState, PatchError> {
    let mut state = initial.clone();
    let mut version = Fingerprint::of(&state)?;
    for op in operations {
        if let Some(base) = &op.base {
            let actual = version.to_hex();
            if *base != actual {
                return Err(PatchError::StaleBase {
                    expected: base.clone(),
                    actual,
                });
            }
        }
        advance(&mut state, &mut version, &op.diff)?;
        log::trace!("replayed op {}", op.id);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use drawnet_core::{DiffConfig, HistoryConfig};

    use super::*;
    use crate::drawing::tests::{fitting, pipe, sample};

    fn document() -> Document {
        Document::new(sample(), &DocumentConfig::default()).unwrap()
    }

    fn height(doc: &Document, level: &str) -> f64 {
        doc.state().level(level).unwrap().floor_height_m
    }

    fn set_height(h: f64) -> Patch<DrawingState> {
        Patch::empty().set(&["levels", "ground", "floorHeightM"], json!(h))
    }

    #[test]
    fn initial_drawing_floor_height_undo() {
        let mut doc = Document::from_config(&DocumentConfig::default()).unwrap();
        let initial = doc.fingerprint().to_string();
        assert_eq!(height(&doc, "ground"), 0.0);

        doc.apply(set_height(15.0)).unwrap();
        assert_eq!(height(&doc, "ground"), 15.0);

        assert!(doc.undo().unwrap());
        assert_eq!(height(&doc, "ground"), 0.0);
        assert_eq!(doc.fingerprint(), initial);

        assert!(doc.redo().unwrap());
        assert_eq!(height(&doc, "ground"), 15.0);
        assert!(!doc.redo().unwrap());
    }

    #[test]
    fn rejected_patch_changes_nothing() {
        let mut doc = document();
        let before = doc.fingerprint().to_string();
        let err = doc
            .apply(Patch::empty().delete(&["levels", "ground", "entities", "f1"]))
            .unwrap_err();
        assert!(matches!(
            &err,
            PatchError::Validation(errors)
                if matches!(&errors[..], [ModelError::Integrity { uid, .. }] if uid == "f1")
        ));
        assert_eq!(doc.fingerprint(), before);
        assert!(doc.operations().is_empty());
        assert!(!doc.can_undo());
    }

    #[test]
    fn edit_surfaces_model_errors() {
        let mut doc = document();
        let err = doc
            .edit(|d| d.remove("ground", "f1").map(drop))
            .unwrap_err();
        assert_eq!(
            err,
            PatchError::Model(ModelError::Integrity {
                uid: "f1".into(),
                dependents: vec!["p1".into(), "pg".into()],
            })
        );
        assert!(doc.operations().is_empty());
    }

    #[test]
    fn edit_records_pipe_insertion() {
        let mut doc = document();
        let op = doc
            .edit(|d| {
                d.insert("ground", fitting("f3"))?;
                d.insert("ground", pipe("p3", ["fx-cold", "f3"]))
            })
            .unwrap()
            .unwrap();
        assert_eq!(
            op.diff.to_value(),
            json!({"levels": {"ground": {"entities": {
                "f3": serde_json::to_value(fitting("f3")).unwrap(),
                "p3": serde_json::to_value(pipe("p3", ["fx-cold", "f3"])).unwrap(),
            }}}})
        );
        assert_eq!(
            op.inverse.to_value(),
            json!({"levels": {"ground": {"entities": {
                "f3": {"deleted": true},
                "p3": {"deleted": true},
            }}}})
        );
        let neighbors: Vec<&str> = doc
            .state()
            .neighbors("f3")
            .unwrap()
            .iter()
            .map(|p| p.uid.as_str())
            .collect();
        assert_eq!(neighbors, vec!["p3"]);

        doc.undo().unwrap();
        assert!(!doc.state().contains("p3"));
        assert!(!doc.state().contains("f3"));
    }

    #[test]
    fn cascade_removal_is_one_undoable_edit() {
        let mut doc = document();
        let original = doc.snapshot();
        doc.edit(|d| d.remove_cascade("ground", "f1").map(drop))
            .unwrap()
            .unwrap();
        assert!(!doc.state().contains("f1"));
        assert!(!doc.state().contains("p1"));
        assert!(!doc.state().contains("pg"));
        doc.undo().unwrap();
        assert_eq!(doc.state(), original.as_ref());
    }

    #[test]
    fn no_op_edit_records_nothing() {
        let mut doc = document();
        assert_eq!(doc.edit(|_| Ok(())).unwrap(), None);
        let op = doc
            .edit(|d| d.set_floor_height("ground", 1e-9).map(drop))
            .unwrap();
        assert_eq!(op, None);
        assert!(doc.operations().is_empty());
    }

    #[test]
    fn edit_within_drops_untouched_paths() {
        let mut doc = document();
        let filter = DiffFilter::new().with(&["levels", "first", "floorHeightM"]);
        let op = doc
            .edit_within(&filter, |d| {
                d.set_floor_height("first", 4.0)?;
                d.set_floor_height("ground", -1.0).map(drop)
            })
            .unwrap()
            .unwrap();
        assert_eq!(
            op.diff.to_value(),
            json!({"levels": {"first": {"floorHeightM": 4.0}}})
        );
        assert_eq!(height(&doc, "first"), 4.0);
        assert_eq!(height(&doc, "ground"), 0.0);
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut doc = document();
        doc.apply(set_height(1.0)).unwrap();
        doc.undo().unwrap();
        assert!(doc.can_redo());
        doc.apply(set_height(2.0)).unwrap();
        assert!(!doc.can_redo());
        assert!(!doc.redo().unwrap());
        doc.undo().unwrap();
        assert_eq!(height(&doc, "ground"), 0.0);
        assert!(!doc.undo().unwrap());
    }

    #[test]
    fn undo_depth_is_bounded() {
        let config = DocumentConfig {
            history: HistoryConfig { max_undo: 2 },
            ..DocumentConfig::default()
        };
        let mut doc = Document::new(sample(), &config).unwrap();
        for h in [1.0, 2.0, 3.0] {
            doc.apply(set_height(h)).unwrap();
        }
        assert!(doc.undo().unwrap());
        assert!(doc.undo().unwrap());
        assert!(!doc.undo().unwrap());
        assert_eq!(height(&doc, "ground"), 1.0);
    }

    #[test]
    fn stale_operations_are_rejected() {
        let mut doc = document();
        let op = doc.apply(set_height(1.0)).unwrap();
        let err = doc.apply_operation(&op).unwrap_err();
        assert!(matches!(err, PatchError::StaleBase { .. }));

        let fresh = Operation::new(99, set_height(2.0), Patch::empty())
            .with_base(doc.fingerprint());
        let applied = doc.apply_operation(&fresh).unwrap();
        assert_eq!(height(&doc, "ground"), 2.0);
        assert_eq!(applied.inverse, set_height(1.0));
    }

    #[test]
    fn ids_increase_across_undo_and_redo() {
        let mut doc = document();
        doc.apply(set_height(1.0)).unwrap();
        doc.undo().unwrap();
        doc.redo().unwrap();
        let ids: Vec<u64> = doc.operations().iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn replay_reproduces_the_session() {
        let initial = sample();
        let mut doc = Document::new(initial.clone(), &DocumentConfig::default()).unwrap();
        doc.apply(set_height(5.0)).unwrap();
        doc.edit(|d| d.insert("first", fitting("f9"))).unwrap();
        doc.undo().unwrap();
        doc.edit(|d| d.set_floor_height("first", 6.0).map(drop))
            .unwrap();

        let persisted: Vec<Operation> = doc
            .operations()
            .iter()
            .map(|op| Operation::from_json(&op.to_json().unwrap()).unwrap())
            .collect();
        let rebuilt = replay(&initial, &persisted).unwrap();
        assert_eq!(&rebuilt, doc.state());

        let err = replay(&initial, &persisted[1..]).unwrap_err();
        assert!(matches!(err, PatchError::StaleBase { .. }));
    }

    #[test]
    fn snapshots_are_isolated_from_later_edits() {
        let mut doc = document();
        let reader = doc.snapshot();
        doc.apply(set_height(9.0)).unwrap();
        assert_eq!(reader.level("ground").unwrap().floor_height_m, 0.0);
        assert_eq!(height(&doc, "ground"), 9.0);
    }

    #[test]
    fn fingerprint_follows_every_transition() {
        let mut doc = document();
        let reader = doc.snapshot();
        doc.apply(set_height(2.5)).unwrap();
        doc.edit(|d| {
            d.insert("first", fitting("f9"))?;
            d.insert("first", pipe("p9", ["f9", "r1"]))
        })
        .unwrap();
        doc.edit(|d| d.remove_level("ground").map(drop)).unwrap();
        assert!(doc
            .apply(Patch::empty().delete(&["shared", "r1"]))
            .is_err());
        assert_eq!(doc.fingerprint(), doc.state().fingerprint().unwrap());

        doc.undo().unwrap();
        assert_eq!(doc.fingerprint(), doc.state().fingerprint().unwrap());
        doc.undo().unwrap();
        doc.undo().unwrap();
        assert_eq!(doc.fingerprint(), reader.fingerprint().unwrap());
        assert_eq!(doc.state(), reader.as_ref());
        doc.redo().unwrap();
        assert_eq!(doc.fingerprint(), doc.state().fingerprint().unwrap());
    }

    #[test]
    fn invalid_initial_state_is_refused() {
        let mut state = sample();
        state
            .levels
            .get_mut("ground")
            .unwrap()
            .entities
            .remove("f1");
        let err = Document::new(state, &DocumentConfig::default()).unwrap_err();
        assert!(matches!(err, PatchError::Validation(_)));
    }

    #[test]
    fn tiny_epsilon_reports_small_changes() {
        let config = DocumentConfig {
            diff: DiffConfig { float_epsilon: 0.0 },
            ..DocumentConfig::default()
        };
        let mut doc = Document::new(sample(), &config).unwrap();
        let op = doc
            .edit(|d| d.set_floor_height("ground", 1e-9).map(drop))
            .unwrap();
        assert!(op.is_some());
    }
}
