//! Undo and redo stacks.
//!
//! History is strictly linear: recording a new edit discards anything that
//! could have been redone.

use std::collections::VecDeque;

use crate::operation::Operation;

/// Sequential undo/redo stacks of operations.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: VecDeque<Operation>,
    redo: Vec<Operation>,
    /// Maximum undo depth; 0 means unbounded.
    max_undo: usize,
}

impl History {
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_undo,
        }
    }

    /// Record a fresh edit. Clears the redo stack and drops the oldest
    /// entries beyond the depth bound.
    pub fn record(&mut self, op: Operation) {
        self.redo.clear();
        self.push_undo(op);
    }

    /// Push onto the undo stack without touching redo (used by redo).
    pub fn push_undo(&mut self, op: Operation) {
        self.undo.push_back(op);
        if self.max_undo > 0 {
            while self.undo.len() > self.max_undo {
                if let Some(dropped) = self.undo.pop_front() {
                    log::debug!("undo depth {} reached, dropping op {}", self.max_undo, dropped.id);
                }
            }
        }
    }

    pub fn pop_undo(&mut self) -> Option<Operation> {
        self.undo.pop_back()
    }

    pub fn push_redo(&mut self, op: Operation) {
        self.redo.push(op);
    }

    pub fn pop_redo(&mut self) -> Option<Operation> {
        self.redo.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;

    fn op(id: u64) -> Operation {
        Operation::new(id, Patch::empty(), Patch::empty())
    }

    #[test]
    fn undo_then_redo_order() {
        let mut history = History::new(0);
        history.record(op(1));
        history.record(op(2));
        let last = history.pop_undo().unwrap();
        assert_eq!(last.id, 2);
        history.push_redo(last);
        assert!(history.can_redo());
        assert_eq!(history.pop_redo().unwrap().id, 2);
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn recording_clears_redo() {
        let mut history = History::new(0);
        history.record(op(1));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        history.record(op(2));
        assert!(!history.can_redo());
        assert_eq!(history.pop_undo().unwrap().id, 2);
        assert!(!history.can_undo());
    }

    #[test]
    fn depth_bound_drops_oldest() {
        let mut history = History::new(2);
        for id in 1..=4 {
            history.record(op(id));
        }
        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.pop_undo().unwrap().id, 4);
        assert_eq!(history.pop_undo().unwrap().id, 3);
        assert!(history.pop_undo().is_none());
    }

    #[test]
    fn zero_means_unbounded() {
        let mut history = History::new(0);
        for id in 0..500 {
            history.record(op(id));
        }
        assert_eq!(history.undo_len(), 500);
        assert_eq!(history.pop_undo().unwrap().id, 499);
    }
}
