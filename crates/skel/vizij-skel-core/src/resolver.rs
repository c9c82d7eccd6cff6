//! Inherited relationship and attribute resolution.
//!
//! A value authored on a node applies to all of its descendants until another
//! node overrides it with a new value or cuts it off with a block. Lookups walk
//! from the node up the occurrence-path ancestor chain, stopping at the
//! traversal boundary, and memoise the answer for every node they passed so a
//! pre-order walk pays for each node once.
//!
//! Inside an instance occurrence, targets that point into the prototype the
//! value was authored in are re-rooted onto that occurrence. Targets anywhere
//! else are left untouched.

use hashbrown::HashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use vizij_scene_core::{AttrValue, Authored, InstanceContext, NodeRef, SceneGraph, ScenePath};

use crate::tokens;

/// How a resolved target path was obtained.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetOrigin {
    /// Authored path used as-is.
    #[default]
    Absolute,
    /// Authored inside `prototype` pointing into the same prototype; the path
    /// was re-rooted onto the occurrence being resolved.
    PrototypeLocal { prototype: ScenePath },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub path: ScenePath,
    pub origin: TargetOrigin,
}

impl ResolvedTarget {
    pub fn absolute(path: ScenePath) -> Self {
        Self {
            path,
            origin: TargetOrigin::Absolute,
        }
    }

    pub fn is_prototype_local(&self) -> bool {
        matches!(self.origin, TargetOrigin::PrototypeLocal { .. })
    }
}

/// An attribute value together with the node (occurrence path) it was
/// authored on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAttr {
    pub value: AttrValue,
    pub source: ScenePath,
}

/// Translate targets authored on a node into the occurrence that node belongs
/// to.
pub fn remap_targets(targets: Vec<ScenePath>, context: Option<&InstanceContext>) -> Vec<ResolvedTarget> {
    targets
        .into_iter()
        .map(|target| remap_target(target, context))
        .collect()
}

pub fn remap_target(target: ScenePath, context: Option<&InstanceContext>) -> ResolvedTarget {
    match context {
        Some(ctx) if ctx.contains_prototype_path(&target) => match ctx.to_occurrence(&target) {
            Some(path) => ResolvedTarget {
                path,
                origin: TargetOrigin::PrototypeLocal {
                    prototype: ctx.prototype.clone(),
                },
            },
            None => ResolvedTarget::absolute(target),
        },
        _ => ResolvedTarget::absolute(target),
    }
}

#[derive(Clone, Debug, Default)]
struct MemoEntry {
    targets: HashMap<String, Option<Vec<ResolvedTarget>>>,
    attributes: HashMap<String, Option<ResolvedAttr>>,
}

/// Memoising resolver over one scene, bounded by an optional traversal root.
pub struct RelationshipResolver<'s, S: SceneGraph + ?Sized> {
    scene: &'s S,
    boundary: Option<ScenePath>,
    entries: Vec<MemoEntry>,
    index: HashMap<ScenePath, usize>,
}

impl<'s, S: SceneGraph + ?Sized> RelationshipResolver<'s, S> {
    /// Resolver whose lookups stop at `root` (inclusive).
    pub fn bounded(scene: &'s S, root: ScenePath) -> Self {
        Self {
            scene,
            boundary: Some(root),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Resolver whose lookups run up to the top of the scene.
    pub fn unbounded(scene: &'s S) -> Self {
        Self {
            scene,
            boundary: None,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn boundary(&self) -> Option<&ScenePath> {
        self.boundary.as_ref()
    }

    /// A new resolver with the same boundary and a copy of the memo gathered so
    /// far. Used to hand each parallel walker the ancestors already resolved.
    pub fn fork(&self) -> Self {
        Self {
            scene: self.scene,
            boundary: self.boundary.clone(),
            entries: self.entries.clone(),
            index: self.index.clone(),
        }
    }

    /// Number of nodes with memoised entries.
    pub fn memoised_nodes(&self) -> usize {
        self.entries.len()
    }

    fn slot(&mut self, path: &ScenePath) -> usize {
        if let Some(slot) = self.index.get(path) {
            return *slot;
        }
        let slot = self.entries.len();
        self.entries.push(MemoEntry::default());
        self.index.insert(path.clone(), slot);
        slot
    }

    fn resolve<T, R, M>(&mut self, node: &NodeRef, name: &str, read: R, memo: M) -> Option<T>
    where
        T: Clone,
        R: Fn(&S, &NodeRef) -> Authored<T>,
        M: Fn(&mut MemoEntry) -> &mut HashMap<String, Option<T>>,
    {
        let scene = self.scene;
        let mut pending = Vec::new();
        let mut current = Some(node.clone());
        let resolved = loop {
            let Some(n) = current.take() else {
                break None;
            };
            let slot = self.slot(n.path());
            if let Some(hit) = memo(&mut self.entries[slot]).get(name) {
                break hit.clone();
            }
            pending.push(slot);
            match read(scene, &n) {
                Authored::Blocked => break None,
                Authored::Authored(value) => break Some(value),
                Authored::Unauthored => {}
            }
            if self.boundary.as_ref() == Some(n.path()) {
                break None;
            }
            current = scene.parent(&n);
        };
        for slot in pending {
            memo(&mut self.entries[slot]).insert(name.to_string(), resolved.clone());
        }
        resolved
    }

    /// Effective targets of an inheritable relationship. `None` when unbound
    /// or blocked.
    pub fn resolve_targets(&mut self, node: &NodeRef, name: &str) -> Option<Vec<ResolvedTarget>> {
        self.resolve(
            node,
            name,
            |scene, n| {
                scene
                    .relationship(n, name)
                    .map(|targets| remap_targets(targets, n.instance_context()))
            },
            |entry| &mut entry.targets,
        )
    }

    /// Effective value of an inheritable attribute and the node it came from.
    pub fn resolve_attribute(&mut self, node: &NodeRef, name: &str) -> Option<ResolvedAttr> {
        self.resolve(
            node,
            name,
            |scene, n| {
                scene.attribute(n, name).map(|value| ResolvedAttr {
                    value,
                    source: n.path().clone(),
                })
            },
            |entry| &mut entry.attributes,
        )
    }

    fn first_target(&mut self, node: &NodeRef, name: &str) -> Option<ResolvedTarget> {
        let mut targets = self.resolve_targets(node, name)?;
        if targets.len() > 1 {
            warn!(
                "{} on '{}' has {} targets; using the first",
                name,
                node.path(),
                targets.len()
            );
        }
        if targets.is_empty() {
            return None;
        }
        Some(targets.swap_remove(0))
    }

    /// Skeleton bound to a skinnable node.
    pub fn resolve_skeleton(&mut self, node: &NodeRef) -> Option<ResolvedTarget> {
        self.first_target(node, tokens::SKEL_SKELETON)
    }

    /// Animation source bound to a skeleton node.
    pub fn resolve_animation_source(&mut self, node: &NodeRef) -> Option<ResolvedTarget> {
        let target = self.first_target(node, tokens::SKEL_ANIMATION_SOURCE);
        if let Some(t) = &target {
            debug!("animation source of '{}' -> '{}'", node.path(), t.path);
        }
        target
    }

    /// Targets authored on the node itself, without inheritance.
    pub fn local_targets(&self, node: &NodeRef, name: &str) -> Option<Vec<ResolvedTarget>> {
        self.scene
            .relationship(node, name)
            .into_value()
            .map(|targets| remap_targets(targets, node.instance_context()))
    }

    /// Attribute authored on the node itself, without inheritance.
    pub fn local_attribute(&self, node: &NodeRef, name: &str) -> Option<AttrValue> {
        self.scene.attribute(node, name).into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizij_scene_core::{NodeKind, Stage};

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    fn stage() -> Stage {
        let mut stage = Stage::new();
        for (path, kind) in [
            ("/Root", NodeKind::Root),
            ("/Root/A", NodeKind::Other),
            ("/Root/A/B", NodeKind::Other),
            ("/Root/A/B/C", NodeKind::Skinnable),
            ("/Root/Blocked", NodeKind::Other),
            ("/Root/Blocked/D", NodeKind::Skinnable),
            ("/Proto", NodeKind::Other),
            ("/Proto/Skel", NodeKind::Skeleton),
            ("/Proto/Mesh", NodeKind::Skinnable),
            ("/Root/I", NodeKind::Other),
        ] {
            stage.define(path, kind).unwrap();
        }
        stage.set_relationship("/Root/A", "rel", &["/X"]).unwrap();
        stage.block_relationship("/Root/Blocked", "rel").unwrap();
        stage.set_relationship("/Root", "rel", &["/Top"]).unwrap();
        stage
            .set_attribute("/Root/A/B", "attr", AttrValue::tokens(["b"]))
            .unwrap();
        stage
            .set_relationship("/Proto/Mesh", "rel", &["/Proto/Skel", "/Elsewhere"])
            .unwrap();
        stage.set_instance("/Root/I", "/Proto").unwrap();
        stage
    }

    #[test]
    fn nearest_authored_value_wins() {
        let stage = stage();
        let mut resolver = RelationshipResolver::bounded(&stage, p("/Root"));
        let node = stage.node_at(&p("/Root/A/B/C")).unwrap();
        let targets = resolver.resolve_targets(&node, "rel").unwrap();
        assert_eq!(targets, vec![ResolvedTarget::absolute(p("/X"))]);

        let attr = resolver.resolve_attribute(&node, "attr").unwrap();
        assert_eq!(attr.source, p("/Root/A/B"));
        assert_eq!(attr.value, AttrValue::tokens(["b"]));
        assert!(resolver.resolve_attribute(&node, "missing").is_none());
    }

    #[test]
    fn block_short_circuits_inheritance() {
        let stage = stage();
        let mut resolver = RelationshipResolver::bounded(&stage, p("/Root"));
        let node = stage.node_at(&p("/Root/Blocked/D")).unwrap();
        assert!(resolver.resolve_targets(&node, "rel").is_none());
    }

    #[test]
    fn boundary_is_inclusive() {
        let stage = stage();
        let node = stage.node_at(&p("/Root/A/B")).unwrap();
        let mut bounded = RelationshipResolver::bounded(&stage, p("/Root/A/B"));
        assert!(bounded.resolve_targets(&node, "rel").is_none());
        let mut at_a = RelationshipResolver::bounded(&stage, p("/Root/A"));
        assert!(at_a.resolve_targets(&node, "rel").is_some());

        let root = stage.node_at(&p("/Root")).unwrap();
        let mut unbounded = RelationshipResolver::unbounded(&stage);
        assert_eq!(
            unbounded.resolve_targets(&root, "rel"),
            Some(vec![ResolvedTarget::absolute(p("/Top"))])
        );
    }

    #[test]
    fn memo_covers_every_visited_node() {
        let stage = stage();
        let mut resolver = RelationshipResolver::bounded(&stage, p("/Root"));
        let node = stage.node_at(&p("/Root/A/B/C")).unwrap();
        resolver.resolve_targets(&node, "rel");
        assert_eq!(resolver.memoised_nodes(), 3);
        let forked = resolver.fork();
        assert_eq!(forked.memoised_nodes(), 3);
        assert_eq!(forked.boundary(), Some(&p("/Root")));
    }

    #[test]
    fn prototype_local_targets_stay_in_their_occurrence() {
        let stage = stage();
        let mut resolver = RelationshipResolver::bounded(&stage, p("/Root"));
        let mesh = stage.node_at(&p("/Root/I/Mesh")).unwrap();
        let targets = resolver.resolve_targets(&mesh, "rel").unwrap();
        assert_eq!(targets[0].path, p("/Root/I/Skel"));
        assert_eq!(
            targets[0].origin,
            TargetOrigin::PrototypeLocal {
                prototype: p("/Proto")
            }
        );
        assert_eq!(targets[1], ResolvedTarget::absolute(p("/Elsewhere")));
        assert_eq!(
            resolver.resolve_skeleton(&mesh),
            None,
            "skel:skeleton is not authored anywhere on the chain"
        );
    }
}
