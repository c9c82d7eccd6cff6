use thiserror::Error;

use crate::path::{ScenePath, ScenePathError};

/// Errors produced while authoring a [`Stage`](crate::Stage) or loading a
/// stage document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error(transparent)]
    Path(#[from] ScenePathError),
    #[error("the pseudo-root cannot be authored")]
    PseudoRoot,
    #[error("parent of '{0}' is not defined")]
    MissingParent(ScenePath),
    #[error("prim '{0}' is not defined")]
    MissingPrim(ScenePath),
    #[error("'{0}' lies beneath an instance and cannot be authored directly")]
    BeneathInstance(ScenePath),
    #[error("instance '{0}' has children of its own")]
    InstanceHasChildren(ScenePath),
    #[error("prototype '{prototype}' of instance '{instance}' is not defined")]
    MissingPrototype {
        instance: ScenePath,
        prototype: ScenePath,
    },
    #[error("instancing '{prototype}' at '{instance}' would create a cycle")]
    CyclicInstance {
        instance: ScenePath,
        prototype: ScenePath,
    },
    #[error("stage document parse error: {0}")]
    Parse(String),
}
