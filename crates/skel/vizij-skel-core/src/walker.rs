//! Population traversal.
//!
//! One pre-order walk of the subtree under a skeleton root collects every
//! skeleton it meets and every skinnable node bound to a live skeleton. The
//! walk emits discoveries in pre-order; bindings are then assembled in the
//! order each skeleton was first discovered, either by visiting it or by a
//! target referencing it, whichever came first.
//!
//! With more than one worker thread the root's children are split into
//! contiguous chunks walked on scoped threads. Chunk outputs are concatenated
//! in child order, so the discovery sequence is the same as a sequential walk.

use hashbrown::HashMap;
use log::{debug, trace, warn};
use serde::Serialize;
use vizij_scene_core::{NodeKind, NodeRef, SceneGraph, ScenePath};

use crate::anim_query::AnimQuery;
use crate::binding::SkelBinding;
use crate::config::CacheConfig;
use crate::error::PopulateError;
use crate::resolver::RelationshipResolver;
use crate::skel_query::SkelQuery;
use crate::skinning_query::{SkinningData, SkinningQuery};
use crate::tokens;

/// Outcome of populating one root.
#[derive(Clone, Debug, Default)]
pub struct PopulationResult {
    root: ScenePath,
    generation: u64,
    bindings: Vec<SkelBinding>,
    skeletons: HashMap<ScenePath, SkelQuery>,
}

impl PopulationResult {
    pub fn root(&self) -> &ScenePath {
        &self.root
    }

    /// Scene generation observed while populating.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bindings with at least one target, in first-discovery order.
    pub fn bindings(&self) -> &[SkelBinding] {
        &self.bindings
    }

    pub fn binding_for(&self, skeleton: &ScenePath) -> Option<&SkelBinding> {
        self.bindings
            .iter()
            .find(|b| b.skeleton().path() == Some(skeleton))
    }

    /// Every skeleton seen, bound or not.
    pub fn skel_query(&self, skeleton: &ScenePath) -> Option<&SkelQuery> {
        self.skeletons.get(skeleton)
    }

    pub fn skeletons(&self) -> impl Iterator<Item = (&ScenePath, &SkelQuery)> {
        self.skeletons.iter()
    }

    pub fn summary(&self) -> PopulationSummary {
        PopulationSummary {
            root: self.root.clone(),
            generation: self.generation,
            skeletons: self.skeletons.len(),
            bindings: self.bindings.len(),
            targets: self
                .bindings
                .iter()
                .map(|b| b.skinning_targets().len())
                .sum(),
        }
    }
}

/// Counts reported by a successful populate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PopulationSummary {
    pub root: ScenePath,
    pub generation: u64,
    pub skeletons: usize,
    pub bindings: usize,
    pub targets: usize,
}

enum Discovery {
    Skeleton(SkelQuery),
    Target {
        skeleton: NodeRef,
        data: SkinningData,
        node: NodeRef,
    },
}

pub struct PopulationWalker<'s, S: SceneGraph + ?Sized> {
    scene: &'s S,
    config: &'s CacheConfig,
}

impl<'s, S: SceneGraph + Sync + ?Sized> PopulationWalker<'s, S> {
    pub fn new(scene: &'s S, config: &'s CacheConfig) -> Self {
        Self { scene, config }
    }

    /// Check that `root` names an active skeleton root.
    pub fn validate_root(&self, root: &ScenePath) -> Result<NodeRef, PopulateError> {
        let node = self
            .scene
            .node_at(root)
            .ok_or_else(|| PopulateError::RootNotFound(root.clone()))?;
        let kind = self.scene.kind(&node);
        if kind != NodeKind::Root {
            return Err(PopulateError::NotASkelRoot {
                path: root.clone(),
                kind,
            });
        }
        if !self.scene.is_active_in_hierarchy(&node) {
            return Err(PopulateError::InactiveRoot(root.clone()));
        }
        Ok(node)
    }

    pub fn walk(&self, root: &ScenePath) -> Result<PopulationResult, PopulateError> {
        let root_node = self.validate_root(root)?;
        let generation = self.scene.generation();
        let mut resolver = RelationshipResolver::bounded(self.scene, root.clone());

        let mut discoveries = Vec::new();
        self.visit(&mut resolver, &root_node, &mut discoveries);
        let children = if self.descends_into(&root_node) {
            self.scene.children(&root_node)
        } else {
            Vec::new()
        };

        let threads = self.config.effective_threads();
        if threads > 1 && children.len() >= self.config.min_parallel_children.max(2) {
            debug!(
                "walking {} children of '{}' on up to {} threads",
                children.len(),
                root,
                threads
            );
            discoveries.extend(self.walk_parallel(&resolver, &children, threads));
        } else {
            for child in children {
                self.walk_subtree(&mut resolver, child, &mut discoveries);
            }
        }

        Ok(self.assemble(&mut resolver, root, generation, discoveries))
    }

    fn descends_into(&self, node: &NodeRef) -> bool {
        self.config.include_instances || !self.scene.is_instance(node)
    }

    fn walk_subtree(
        &self,
        resolver: &mut RelationshipResolver<'s, S>,
        start: NodeRef,
        out: &mut Vec<Discovery>,
    ) {
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !self.scene.is_active(&node) {
                trace!("skipping inactive subtree '{}'", node.path());
                continue;
            }
            self.visit(resolver, &node, out);
            if self.descends_into(&node) {
                stack.extend(self.scene.children(&node).into_iter().rev());
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn walk_parallel(
        &self,
        resolver: &RelationshipResolver<'s, S>,
        children: &[NodeRef],
        threads: usize,
    ) -> Vec<Discovery> {
        let chunk_size = children.len().div_ceil(threads).max(1);
        let chunks: Vec<Vec<Discovery>> = std::thread::scope(|scope| {
            let handles: Vec<_> = children
                .chunks(chunk_size)
                .map(|chunk| {
                    let mut local = resolver.fork();
                    scope.spawn(move || {
                        let mut out = Vec::new();
                        for child in chunk {
                            self.walk_subtree(&mut local, child.clone(), &mut out);
                        }
                        out
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(out) => out,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        chunks.into_iter().flatten().collect()
    }

    #[cfg(target_arch = "wasm32")]
    fn walk_parallel(
        &self,
        resolver: &RelationshipResolver<'s, S>,
        children: &[NodeRef],
        _threads: usize,
    ) -> Vec<Discovery> {
        let mut local = resolver.fork();
        let mut out = Vec::new();
        for child in children {
            self.walk_subtree(&mut local, child.clone(), &mut out);
        }
        out
    }

    fn visit(
        &self,
        resolver: &mut RelationshipResolver<'s, S>,
        node: &NodeRef,
        out: &mut Vec<Discovery>,
    ) {
        match self.scene.kind(node) {
            NodeKind::Skeleton => {
                out.push(Discovery::Skeleton(self.skel_query(resolver, node)));
            }
            NodeKind::Skinnable => {
                if let Some((skeleton, data)) = self.skinning_data(resolver, node) {
                    out.push(Discovery::Target {
                        skeleton,
                        data,
                        node: node.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    fn skel_query(&self, resolver: &mut RelationshipResolver<'s, S>, node: &NodeRef) -> SkelQuery {
        let anim = match resolver.resolve_animation_source(node) {
            Some(target) => AnimQuery::from_path(self.scene, &target.path, target.origin),
            None => AnimQuery::invalid(),
        };
        SkelQuery::from_node(self.scene, node, anim)
    }

    fn skinning_data(
        &self,
        resolver: &mut RelationshipResolver<'s, S>,
        node: &NodeRef,
    ) -> Option<(NodeRef, SkinningData)> {
        let target = resolver.resolve_skeleton(node)?;
        let Some(skeleton) = self.scene.node_at(&target.path) else {
            warn!(
                "'{}' is bound to missing skeleton '{}'",
                node.path(),
                target.path
            );
            return None;
        };
        if self.scene.kind(&skeleton) != NodeKind::Skeleton {
            warn!(
                "'{}' is bound to '{}', which is not a skeleton",
                node.path(),
                target.path
            );
            return None;
        }
        if !self.scene.is_active_in_hierarchy(&skeleton) {
            debug!(
                "'{}' is bound to inactive skeleton '{}'",
                node.path(),
                target.path
            );
            return None;
        }

        let data = SkinningData {
            skeleton: target.path,
            joint_indices: resolver.resolve_attribute(node, tokens::JOINT_INDICES),
            joint_weights: resolver.resolve_attribute(node, tokens::JOINT_WEIGHTS),
            joint_order: resolver.resolve_attribute(node, tokens::SKEL_JOINTS),
            blend_shapes: resolver.local_attribute(node, tokens::SKEL_BLEND_SHAPES),
            blend_shape_targets: resolver
                .local_targets(node, tokens::SKEL_BLEND_SHAPE_TARGETS)
                .unwrap_or_default(),
        };
        Some((skeleton, data))
    }

    fn assemble(
        &self,
        resolver: &mut RelationshipResolver<'s, S>,
        root: &ScenePath,
        generation: u64,
        discoveries: Vec<Discovery>,
    ) -> PopulationResult {
        let mut skeletons: HashMap<ScenePath, SkelQuery> = HashMap::new();
        let mut order: Vec<SkeletonSlot> = Vec::new();
        let mut slots: HashMap<ScenePath, usize> = HashMap::new();

        for discovery in discoveries {
            match discovery {
                Discovery::Skeleton(query) => {
                    let Some(path) = query.path().cloned() else {
                        continue;
                    };
                    slot_for(&mut slots, &mut order, &path);
                    skeletons.insert(path, query);
                }
                Discovery::Target {
                    skeleton,
                    data,
                    node,
                } => {
                    let slot = slot_for(&mut slots, &mut order, skeleton.path());
                    let entry = &mut order[slot];
                    entry.node.get_or_insert(skeleton);
                    entry.targets.push((node, data));
                }
            }
        }

        let mut external: Option<RelationshipResolver<'s, S>> = None;
        let mut bindings = Vec::new();
        for slot in order {
            if slot.targets.is_empty() {
                continue;
            }
            let query = match (skeletons.get(&slot.path), &slot.node) {
                (Some(query), _) => query.clone(),
                (None, Some(skeleton)) => {
                    // Bound from inside the root but not walked: outside the
                    // root, or behind an instance that was not expanded.
                    let query = if skeleton.path().has_prefix(root) {
                        self.skel_query(resolver, skeleton)
                    } else {
                        let unbounded = external
                            .get_or_insert_with(|| RelationshipResolver::unbounded(self.scene));
                        self.skel_query(unbounded, skeleton)
                    };
                    skeletons.insert(slot.path.clone(), query.clone());
                    query
                }
                (None, None) => continue,
            };
            let targets = slot
                .targets
                .into_iter()
                .map(|(node, data)| SkinningQuery::new(&node, data, query.joint_order()))
                .collect();
            bindings.push(SkelBinding::new(query, targets));
        }

        debug!(
            "populated '{}': {} skeletons, {} bindings",
            root,
            skeletons.len(),
            bindings.len()
        );
        PopulationResult {
            root: root.clone(),
            generation,
            bindings,
            skeletons,
        }
    }
}

/// Per-skeleton accumulator, kept in skeleton first-discovery order.
struct SkeletonSlot {
    path: ScenePath,
    /// Set when a target references the skeleton.
    node: Option<NodeRef>,
    targets: Vec<(NodeRef, SkinningData)>,
}

fn slot_for(
    slots: &mut HashMap<ScenePath, usize>,
    order: &mut Vec<SkeletonSlot>,
    path: &ScenePath,
) -> usize {
    *slots.entry(path.clone()).or_insert_with(|| {
        order.push(SkeletonSlot {
            path: path.clone(),
            node: None,
            targets: Vec::new(),
        });
        order.len() - 1
    })
}
