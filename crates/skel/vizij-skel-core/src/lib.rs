//! Skeleton binding resolution over a Vizij scene graph.
//!
//! [`SkelCache::populate`] walks the subtree under a skeleton root once and
//! records which animation drives each skeleton and which skinnable nodes each
//! skeleton deforms. Lookups afterwards are cheap and read-only.
//!
//! ```no_run
//! use vizij_scene_core::{ScenePath, Stage};
//! use vizij_skel_core::{CacheConfig, SkelCache};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stage = Stage::from_json_str(r#"{"prims": [{"path": "/Root", "kind": "root"}]}"#)?;
//! let cache = SkelCache::with_config(CacheConfig::with_instances(true));
//! let root = ScenePath::parse("/Root")?;
//! if cache.populate(&stage, &root) {
//!     for binding in cache.compute_skel_bindings(&root) {
//!         println!("{:?} -> {:?}", binding.skeleton().path(), binding.target_paths());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod anim_query;
pub mod binding;
pub mod cache;
pub mod config;
pub mod error;
pub mod joint_mapper;
pub mod resolver;
pub mod skel_query;
pub mod skinning_query;
pub mod tokens;
pub mod walker;

pub use anim_query::AnimQuery;
pub use binding::SkelBinding;
pub use cache::SkelCache;
pub use config::CacheConfig;
pub use error::PopulateError;
pub use joint_mapper::JointMapper;
pub use resolver::{RelationshipResolver, ResolvedAttr, ResolvedTarget, TargetOrigin};
pub use skel_query::SkelQuery;
pub use skinning_query::{SkinningData, SkinningQuery};
pub use walker::{PopulationResult, PopulationSummary, PopulationWalker};
