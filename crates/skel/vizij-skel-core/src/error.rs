use thiserror::Error;
use vizij_scene_core::{NodeKind, ScenePath};

/// Reasons a root cannot be populated. Nothing is committed to the cache when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopulateError {
    #[error("root '{0}' does not exist")]
    RootNotFound(ScenePath),
    #[error("'{path}' is a {kind} node, not a skeleton root")]
    NotASkelRoot { path: ScenePath, kind: NodeKind },
    #[error("root '{0}' is inactive")]
    InactiveRoot(ScenePath),
}
