//! Error types for the drawing model.

use std::path::PathBuf;

use crate::entity::Uid;

/// Errors from entity, level, and flow system operations.
///
/// Integrity checks that can find several problems at once return
/// `Vec<ModelError>` rather than stopping at the first violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("duplicate entity uid: {0}")]
    DuplicateId(Uid),

    #[error("entity {0} not found")]
    NotFound(Uid),

    #[error("level {0} not found")]
    LevelNotFound(Uid),

    #[error("duplicate level uid: {0}")]
    DuplicateLevel(Uid),

    #[error("entity {uid} has parent {parent} which does not exist in its level")]
    DanglingParent { uid: Uid, parent: Uid },

    #[error("removing {uid} would leave dangling references from {}", .dependents.join(", "))]
    Integrity { uid: Uid, dependents: Vec<Uid> },

    #[error("entity {uid} references {target} which does not exist")]
    DanglingReference { uid: Uid, target: Uid },

    #[error("system node {0} has no parent entity")]
    OrphanSystemNode(Uid),

    #[error("pipe {uid} cannot have a parent, found {parent}")]
    ParentedPipe { uid: Uid, parent: Uid },

    #[error("pipe {0} connects an entity to itself")]
    DegeneratePipe(Uid),

    #[error("pipe {pipe} endpoint {endpoint} lives on another level")]
    CrossLevelEndpoint { pipe: Uid, endpoint: Uid },

    #[error("flow system {0} is not defined")]
    UnknownSystem(Uid),

    #[error("flow system {system} has no {network} network")]
    UnknownNetwork { system: Uid, network: String },

    #[error("flow system {system} is referenced by {} entities", .users.len())]
    SystemInUse { system: Uid, users: Vec<Uid> },

    #[error("duplicate flow system uid: {0}")]
    DuplicateSystem(Uid),

    #[error("{entity_type} entity {uid} cannot be stored {location}")]
    MisplacedEntity {
        uid: Uid,
        entity_type: String,
        location: String,
    },

    #[error("map key {key} does not match uid {uid}")]
    KeyMismatch { key: String, uid: Uid },

    #[error("parent cycle detected involving entity {0}")]
    ParentCycle(Uid),

    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("TOML error: {0}")]
    Toml(String),

    #[error("I/O error at {path}: {detail}")]
    Io { path: PathBuf, detail: String },
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Json(err.to_string())
    }
}

impl From<toml::de::Error> for ModelError {
    fn from(err: toml::de::Error) -> Self {
        ModelError::Toml(err.to_string())
    }
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::NotFound("fitting-1".into());
        assert!(err.to_string().contains("not found"));

        let err = ModelError::Integrity {
            uid: "f1".into(),
            dependents: vec!["p1".into(), "p2".into()],
        };
        assert_eq!(
            err.to_string(),
            "removing f1 would leave dangling references from p1, p2"
        );
    }

    #[test]
    fn json_error_converts() {
        let err: ModelError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ModelError::Json(_)));
    }
}
