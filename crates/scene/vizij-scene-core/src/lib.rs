//! Scene hierarchy model for Vizij skeleton binding.
//!
//! [`SceneGraph`] is the read-only view skeleton binding walks. [`Stage`] is an
//! in-memory implementation with instancing support that can be authored
//! programmatically or loaded from a JSON [`StageDocument`].

pub mod document;
pub mod error;
pub mod graph;
pub mod ids;
pub mod path;
pub mod prim;
pub mod stage;

pub use document::{PrimSpec, StageDocument};
pub use error::StageError;
pub use graph::{InstanceContext, NodeRef, SceneGraph};
pub use ids::{PrimId, PrimIdAllocator};
pub use path::{ScenePath, ScenePathError};
pub use prim::{AttrValue, Authored, NodeKind, Prim};
pub use stage::Stage;
