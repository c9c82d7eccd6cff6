//! Entry point for skeleton binding lookups.
//!
//! A [`SkelCache`] stores one [`PopulationResult`] per populated root, a
//! cross-root index of every skeleton any population has seen, and a memo of
//! direct animation lookups. Results are built without holding any lock and
//! published with a single insert, so readers see either the previous result
//! or the new one.
//!
//! Re-populating a root drops skeletons it no longer sees from the index
//! unless another populated root still holds them. The animation memo keeps
//! only entries read at the latest scene generation.
//!
//! The cache never watches the scene. Results record the scene generation they
//! were built from; callers re-populate when [`SkelCache::is_current`] says the
//! scene moved on.

use std::sync::Arc;

use hashbrown::HashMap;
use log::{debug, info, warn};
use parking_lot::RwLock;
use vizij_scene_core::{NodeRef, SceneGraph, ScenePath};

use crate::anim_query::AnimQuery;
use crate::binding::SkelBinding;
use crate::config::CacheConfig;
use crate::error::PopulateError;
use crate::resolver::TargetOrigin;
use crate::skel_query::SkelQuery;
use crate::walker::{PopulationResult, PopulationSummary, PopulationWalker};

#[derive(Debug, Default)]
pub struct SkelCache {
    config: CacheConfig,
    populations: RwLock<HashMap<ScenePath, Arc<PopulationResult>>>,
    skel_index: RwLock<HashMap<ScenePath, SkelQuery>>,
    /// Keyed by node path; entries carry the scene generation they were read at.
    anim_memo: RwLock<HashMap<ScenePath, (u64, AnimQuery)>>,
}

impl SkelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether population expands instance occurrences. Fixed at construction.
    pub fn includes_instances(&self) -> bool {
        self.config.include_instances
    }

    /// Populate `root`, replacing any earlier result for it. Returns false and
    /// leaves the cache untouched when the root is missing, not a skeleton
    /// root, or inactive.
    pub fn populate<S: SceneGraph + Sync + ?Sized>(&self, scene: &S, root: &ScenePath) -> bool {
        match self.try_populate(scene, root) {
            Ok(_) => true,
            Err(err) => {
                warn!("populate rejected: {err}");
                false
            }
        }
    }

    pub fn try_populate<S: SceneGraph + Sync + ?Sized>(
        &self,
        scene: &S,
        root: &ScenePath,
    ) -> Result<PopulationSummary, PopulateError> {
        let result = PopulationWalker::new(scene, &self.config).walk(root)?;
        let summary = result.summary();

        {
            let mut populations = self.populations.write();
            let mut index = self.skel_index.write();
            if let Some(previous) = populations.get(root) {
                // Skeletons this root no longer sees leave the index unless
                // another populated root still holds them.
                for (path, _) in previous.skeletons() {
                    let still_seen = result.skel_query(path).is_some()
                        || populations
                            .iter()
                            .any(|(other, r)| other != root && r.skel_query(path).is_some());
                    if !still_seen {
                        index.remove(path);
                    }
                }
            }
            for (path, query) in result.skeletons() {
                index.insert(path.clone(), query.clone());
            }
            populations.insert(root.clone(), Arc::new(result));
        }

        info!(
            "populated '{}' at generation {}: {} bindings over {} targets",
            summary.root, summary.generation, summary.bindings, summary.targets
        );
        Ok(summary)
    }

    pub fn is_populated(&self, root: &ScenePath) -> bool {
        self.populations.read().contains_key(root)
    }

    /// True if `root` is populated and the scene has not changed since.
    pub fn is_current<S: SceneGraph + ?Sized>(&self, scene: &S, root: &ScenePath) -> bool {
        self.populations
            .read()
            .get(root)
            .is_some_and(|result| result.generation() == scene.generation())
    }

    /// Latest population result for `root`.
    pub fn population(&self, root: &ScenePath) -> Option<Arc<PopulationResult>> {
        self.populations.read().get(root).cloned()
    }

    /// Animation query for a node path. Does not require population.
    pub fn anim_query<S: SceneGraph + ?Sized>(&self, scene: &S, path: &ScenePath) -> AnimQuery {
        let generation = scene.generation();
        if let Some((seen, query)) = self.anim_memo.read().get(path) {
            if *seen == generation {
                return query.clone();
            }
        }
        let query = AnimQuery::from_path(scene, path, TargetOrigin::Absolute);
        let mut memo = self.anim_memo.write();
        // Entries from older scene generations can never be hit again.
        memo.retain(|_, (seen, _)| *seen == generation);
        memo.insert(path.clone(), (generation, query.clone()));
        query
    }

    /// Number of memoised animation lookups.
    pub fn memoised_anim_queries(&self) -> usize {
        self.anim_memo.read().len()
    }

    pub fn anim_query_for_node<S: SceneGraph + ?Sized>(
        &self,
        scene: &S,
        node: &NodeRef,
    ) -> AnimQuery {
        self.anim_query(scene, node.path())
    }

    /// Skeleton query from any population that observed `skeleton`; invalid
    /// when none did.
    pub fn skel_query(&self, skeleton: &ScenePath) -> SkelQuery {
        self.skel_index
            .read()
            .get(skeleton)
            .cloned()
            .unwrap_or_default()
    }

    /// Binding of `skeleton` within the populated `root`. A skeleton with no
    /// targets there yields an empty binding that still carries its query.
    pub fn compute_skel_binding(&self, root: &ScenePath, skeleton: &ScenePath) -> SkelBinding {
        let Some(result) = self.population(root) else {
            debug!("compute_skel_binding: '{root}' is not populated");
            return SkelBinding::default();
        };
        if let Some(binding) = result.binding_for(skeleton) {
            return binding.clone();
        }
        let query = match result.skel_query(skeleton) {
            Some(query) => query.clone(),
            None => self.skel_query(skeleton),
        };
        SkelBinding::new(query, Vec::new())
    }

    /// Every binding with at least one target within `root`, in discovery
    /// order. Empty for an unpopulated root.
    pub fn compute_skel_bindings(&self, root: &ScenePath) -> Vec<SkelBinding> {
        self.population(root)
            .map(|result| result.bindings().to_vec())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.populations.write().clear();
        self.skel_index.write().clear();
        self.anim_memo.write().clear();
    }
}
