//! Error types for patch application and the editing session.

use drawnet_core::ModelError;

/// Errors from applying patches and operations.
///
/// A failed apply never changes the document; callers only ever see the
/// state before or after a whole patch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    #[error("patch violates document invariants: {}", join(.0))]
    Validation(Vec<ModelError>),

    #[error("malformed patch: {0}")]
    Malformed(String),

    #[error("stale base: operation was derived from {expected}, document is at {actual}")]
    StaleBase { expected: String, actual: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for PatchError {
    fn from(err: serde_json::Error) -> Self {
        PatchError::Json(err.to_string())
    }
}

fn join(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
