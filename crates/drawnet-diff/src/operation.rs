//! The operation envelope: a forward patch paired with its undo.

use serde::{Deserialize, Serialize};

use drawnet_core::DrawingState;

use crate::error::PatchError;
use crate::patch::Patch;

/// Envelope kinds. Diffs are the only operation a drawing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    #[serde(rename = "DIFF_OPERATION")]
    Diff,
}

/// A recorded edit.
///
/// `diff` moves the document forward and `inverse` takes it back. Both were
/// computed against the snapshot whose fingerprint is `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationType,
    /// Position in the document's operation log (monotonically increasing).
    pub id: u64,
    pub diff: Patch<DrawingState>,
    pub inverse: Patch<DrawingState>,
    /// Fingerprint of the snapshot `diff` applies to. Envelopes without a
    /// base are applied unchecked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl Operation {
    pub fn new(id: u64, diff: Patch<DrawingState>, inverse: Patch<DrawingState>) -> Self {
        Self {
            kind: OperationType::Diff,
            id,
            diff,
            inverse,
            base: None,
        }
    }

    /// Builder: set the base fingerprint.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// The operation that undoes this one: patches swapped, applied to
    /// the snapshot this one produced.
    pub fn inverted(&self, id: u64, base: impl Into<String>) -> Self {
        Operation::new(id, self.inverse.clone(), self.diff.clone()).with_base(base)
    }

    pub fn to_json(&self) -> Result<String, PatchError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PatchError> {
        serde_json::from_str(json).map_err(|e| PatchError::Malformed(e.to_string()))
    }
}
