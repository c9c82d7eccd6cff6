//! In-memory scene graph.
//!
//! Prims live in an arena indexed by [`PrimId`] with a path index on the side.
//! Children keep their definition order. An instance prim has no children of
//! its own: it expands the children of the prototype prim it references, and
//! every expanded node is addressable by its occurrence path.
//!
//! Every mutation bumps the stage generation so that consumers holding
//! derived data can tell when it went stale.

use hashbrown::{HashMap, HashSet};

use crate::error::StageError;
use crate::graph::{InstanceContext, NodeRef, SceneGraph};
use crate::ids::{PrimId, PrimIdAllocator};
use crate::path::ScenePath;
use crate::prim::{AttrValue, Authored, NodeKind, Prim};

#[derive(Debug, Default, Clone)]
pub struct Stage {
    prims: Vec<Option<Prim>>,
    index: HashMap<ScenePath, PrimId>,
    top_level: Vec<PrimId>,
    ids: PrimIdAllocator,
    generation: u64,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of authored prims (instance expansions not counted).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn prim(&self, path: &ScenePath) -> Option<&Prim> {
        self.index.get(path).and_then(|id| self.prim_by_id(*id))
    }

    pub fn prim_by_id(&self, id: PrimId) -> Option<&Prim> {
        self.prims.get(id.index()).and_then(Option::as_ref)
    }

    /// Top-level prims in definition order.
    pub fn top_level(&self) -> impl Iterator<Item = &Prim> {
        self.top_level.iter().filter_map(|id| self.prim_by_id(*id))
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn prim_mut(&mut self, path: &ScenePath) -> Result<&mut Prim, StageError> {
        let id = *self
            .index
            .get(path)
            .ok_or_else(|| StageError::MissingPrim(path.clone()))?;
        self.prims
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| StageError::MissingPrim(path.clone()))
    }

    /// Mutable access for an edit. The generation only moves once the prim is
    /// known to exist.
    fn edit(&mut self, path: &str) -> Result<&mut Prim, StageError> {
        let path = ScenePath::parse(path)?;
        if self.prim(&path).is_none() {
            return Err(StageError::MissingPrim(path));
        }
        self.touch();
        self.prim_mut(&path)
    }

    /// Define a prim, or retype it if it already exists. The parent must
    /// already be defined and must not be an instance.
    pub fn define(&mut self, path: &str, kind: NodeKind) -> Result<ScenePath, StageError> {
        let path = ScenePath::parse(path)?;
        if path.is_root() {
            return Err(StageError::PseudoRoot);
        }
        if let Some(id) = self.index.get(&path).copied() {
            self.touch();
            if let Some(prim) = self.prims.get_mut(id.index()).and_then(Option::as_mut) {
                prim.kind = kind;
            }
            return Ok(path);
        }

        let parent_path = path.parent().ok_or(StageError::PseudoRoot)?;
        let parent = if parent_path.is_root() {
            None
        } else {
            match self.prim(&parent_path) {
                Some(parent) if parent.prototype.is_some() => {
                    return Err(StageError::BeneathInstance(path));
                }
                Some(parent) => Some(parent.id),
                None if self.node_at(&parent_path).is_some() => {
                    return Err(StageError::BeneathInstance(path));
                }
                None => return Err(StageError::MissingParent(path)),
            }
        };

        let id = self.ids.alloc();
        let prim = Prim::new(id, path.clone(), kind, parent);
        debug_assert_eq!(self.prims.len(), id.index());
        self.prims.push(Some(prim));
        self.index.insert(path.clone(), id);
        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.prims.get_mut(parent_id.index()).and_then(Option::as_mut) {
                    parent.children.push(id);
                }
            }
            None => self.top_level.push(id),
        }
        self.touch();
        Ok(path)
    }

    pub fn set_active(&mut self, path: &str, active: bool) -> Result<(), StageError> {
        self.edit(path)?.active = active;
        Ok(())
    }

    /// Author relationship targets. An empty target list is authored as a block.
    pub fn set_relationship(
        &mut self,
        path: &str,
        name: &str,
        targets: &[&str],
    ) -> Result<(), StageError> {
        let targets = targets
            .iter()
            .map(|t| ScenePath::parse(t))
            .collect::<Result<Vec<_>, _>>()?;
        self.set_relationship_state(path, name, authored_targets(targets))
    }

    pub fn block_relationship(&mut self, path: &str, name: &str) -> Result<(), StageError> {
        self.set_relationship_state(path, name, Authored::Blocked)
    }

    pub fn clear_relationship(&mut self, path: &str, name: &str) -> Result<(), StageError> {
        self.edit(path)?.relationships.remove(name);
        Ok(())
    }

    pub(crate) fn set_relationship_state(
        &mut self,
        path: &str,
        name: &str,
        state: Authored<Vec<ScenePath>>,
    ) -> Result<(), StageError> {
        let prim = self.edit(path)?;
        if state.is_unauthored() {
            prim.relationships.remove(name);
        } else {
            prim.relationships.insert(name.to_string(), state);
        }
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        path: &str,
        name: &str,
        value: AttrValue,
    ) -> Result<(), StageError> {
        self.edit(path)?
            .attributes
            .insert(name.to_string(), Authored::Authored(value));
        Ok(())
    }

    pub fn block_attribute(&mut self, path: &str, name: &str) -> Result<(), StageError> {
        self.edit(path)?
            .attributes
            .insert(name.to_string(), Authored::Blocked);
        Ok(())
    }

    pub fn clear_attribute(&mut self, path: &str, name: &str) -> Result<(), StageError> {
        self.edit(path)?.attributes.remove(name);
        Ok(())
    }

    /// Turn a childless prim into an instance of `prototype`.
    pub fn set_instance(&mut self, path: &str, prototype: &str) -> Result<(), StageError> {
        let instance = ScenePath::parse(path)?;
        let prototype = ScenePath::parse(prototype)?;
        let prim = self
            .prim(&instance)
            .ok_or_else(|| StageError::MissingPrim(instance.clone()))?;
        if !prim.children.is_empty() {
            return Err(StageError::InstanceHasChildren(instance));
        }
        if self.prim(&prototype).is_none() {
            return Err(StageError::MissingPrototype {
                instance,
                prototype,
            });
        }
        let mut seen = HashSet::new();
        if self.prototype_reaches(&prototype, &instance, &mut seen) {
            return Err(StageError::CyclicInstance {
                instance,
                prototype,
            });
        }
        self.touch();
        self.prim_mut(&instance)?.prototype = Some(prototype);
        Ok(())
    }

    pub fn clear_instance(&mut self, path: &str) -> Result<(), StageError> {
        self.edit(path)?.prototype = None;
        Ok(())
    }

    /// True if expanding `prototype` can reach `target`, directly or through
    /// nested instances.
    fn prototype_reaches(
        &self,
        prototype: &ScenePath,
        target: &ScenePath,
        seen: &mut HashSet<ScenePath>,
    ) -> bool {
        if target.has_prefix(prototype) {
            return true;
        }
        if !seen.insert(prototype.clone()) {
            return false;
        }
        let nested: Vec<ScenePath> = self
            .index
            .keys()
            .filter(|p| p.has_prefix(prototype))
            .filter_map(|p| self.prim(p).and_then(|prim| prim.prototype.clone()))
            .collect();
        nested
            .iter()
            .any(|next| self.prototype_reaches(next, target, seen))
    }

    /// Remove a prim and its whole subtree. Returns the number of prims removed.
    pub fn remove(&mut self, path: &str) -> Result<usize, StageError> {
        let path = ScenePath::parse(path)?;
        let id = *self
            .index
            .get(&path)
            .ok_or_else(|| StageError::MissingPrim(path.clone()))?;

        let parent = self.prim_by_id(id).and_then(|p| p.parent);
        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.prims.get_mut(parent_id.index()).and_then(Option::as_mut) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => self.top_level.retain(|c| *c != id),
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(prim) = self.prims.get_mut(next.index()).and_then(Option::take) {
                self.index.remove(&prim.path);
                stack.extend(prim.children.iter().copied());
                removed += 1;
            }
        }
        self.touch();
        Ok(removed)
    }

    /// Authored prim backing `node`, following instance links so that an
    /// instance of an instance reports the innermost prototype's children.
    fn expansion_source(&self, node: &NodeRef) -> Option<(&Prim, Option<InstanceContext>)> {
        let mut prim = self.prim(node.source())?;
        let mut context = node.instance_context().cloned();
        while let Some(prototype) = prim.prototype.as_ref() {
            context = Some(InstanceContext {
                occurrence: node.path().clone(),
                prototype: prototype.clone(),
            });
            prim = self.prim(prototype)?;
        }
        Some((prim, context))
    }

    /// Composed value on an instance prim: its own opinion first, then the
    /// opinion on the prototype root.
    fn instance_fallback<'a>(&'a self, prim: &'a Prim) -> Option<&'a Prim> {
        prim.prototype.as_ref().and_then(|p| self.prim(p))
    }
}

fn authored_targets(targets: Vec<ScenePath>) -> Authored<Vec<ScenePath>> {
    if targets.is_empty() {
        Authored::Blocked
    } else {
        Authored::Authored(targets)
    }
}

impl SceneGraph for Stage {
    fn node_at(&self, path: &ScenePath) -> Option<NodeRef> {
        if path.is_root() {
            return None;
        }
        if self.index.contains_key(path) {
            return Some(NodeRef::new(path.clone()));
        }
        // The nearest authored ancestor decides: only an instance can expand
        // paths that are not authored directly.
        let ancestor = path
            .ancestors()
            .skip(1)
            .find(|a| self.index.contains_key(a))?;
        let prototype = self.prim(&ancestor)?.prototype.clone()?;
        let in_prototype = path.replace_prefix(&ancestor, &prototype)?;
        let inner = self.node_at(&in_prototype)?;
        let context = match inner.instance_context() {
            Some(ctx) => InstanceContext {
                occurrence: ctx.occurrence.replace_prefix(&prototype, &ancestor)?,
                prototype: ctx.prototype.clone(),
            },
            None => InstanceContext {
                occurrence: ancestor,
                prototype,
            },
        };
        Some(NodeRef::in_occurrence(
            path.clone(),
            inner.source().clone(),
            context,
        ))
    }

    fn children(&self, node: &NodeRef) -> Vec<NodeRef> {
        let Some((prim, context)) = self.expansion_source(node) else {
            return Vec::new();
        };
        prim.children
            .iter()
            .filter_map(|id| self.prim_by_id(*id))
            .filter_map(|child| {
                let path = node.path().child(child.path.name()).ok()?;
                Some(match &context {
                    Some(ctx) => NodeRef::in_occurrence(path, child.path.clone(), ctx.clone()),
                    None => NodeRef::new(path),
                })
            })
            .collect()
    }

    fn kind(&self, node: &NodeRef) -> NodeKind {
        self.prim(node.source())
            .map(Prim::kind)
            .unwrap_or_default()
    }

    fn is_active(&self, node: &NodeRef) -> bool {
        self.prim(node.source()).is_some_and(Prim::is_active)
    }

    fn relationship(&self, node: &NodeRef, name: &str) -> Authored<Vec<ScenePath>> {
        let Some(prim) = self.prim(node.source()) else {
            return Authored::Unauthored;
        };
        let own = prim.relationship(name);
        if !own.is_unauthored() {
            return own.map(Clone::clone);
        }
        // Targets authored on the prototype root that point into the prototype
        // are re-rooted onto this instance.
        match self.instance_fallback(prim) {
            Some(proto) => proto.relationship(name).map(|targets| {
                targets
                    .iter()
                    .map(|t| t.replace_prefix(&proto.path, node.path()).unwrap_or_else(|| t.clone()))
                    .collect()
            }),
            None => Authored::Unauthored,
        }
    }

    fn attribute(&self, node: &NodeRef, name: &str) -> Authored<AttrValue> {
        let Some(prim) = self.prim(node.source()) else {
            return Authored::Unauthored;
        };
        let own = prim.attribute(name);
        if !own.is_unauthored() {
            return own.map(Clone::clone);
        }
        match self.instance_fallback(prim) {
            Some(proto) => proto.attribute(name).map(Clone::clone),
            None => Authored::Unauthored,
        }
    }

    fn is_instance(&self, node: &NodeRef) -> bool {
        self.prim(node.source())
            .is_some_and(|p| p.prototype.is_some())
    }

    fn prototype_of(&self, node: &NodeRef) -> Option<ScenePath> {
        self.prim(node.source()).and_then(|p| p.prototype.clone())
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    fn instanced_stage() -> Stage {
        let mut stage = Stage::new();
        stage.define("/Proto", NodeKind::Other).unwrap();
        stage.define("/Proto/Skel", NodeKind::Skeleton).unwrap();
        stage.define("/Proto/Mesh", NodeKind::Skinnable).unwrap();
        stage
            .set_relationship("/Proto/Mesh", "skel:skeleton", &["/Proto/Skel"])
            .unwrap();
        stage.define("/Root", NodeKind::Root).unwrap();
        stage.define("/Root/A", NodeKind::Other).unwrap();
        stage.define("/Root/B", NodeKind::Other).unwrap();
        stage.set_instance("/Root/A", "/Proto").unwrap();
        stage.set_instance("/Root/B", "/Proto").unwrap();
        stage
    }

    #[test]
    fn define_requires_parent() {
        let mut stage = Stage::new();
        assert_eq!(
            stage.define("/A/B", NodeKind::Other),
            Err(StageError::MissingParent(p("/A/B")))
        );
        assert_eq!(stage.define("/", NodeKind::Other), Err(StageError::PseudoRoot));
        stage.define("/A", NodeKind::Other).unwrap();
        stage.define("/A/B", NodeKind::Skinnable).unwrap();
        assert_eq!(stage.len(), 2);
        assert_eq!(stage.prim(&p("/A/B")).map(Prim::kind), Some(NodeKind::Skinnable));
    }

    #[test]
    fn children_keep_definition_order() {
        let mut stage = Stage::new();
        stage.define("/R", NodeKind::Root).unwrap();
        for name in ["C", "A", "B"] {
            stage.define(&format!("/R/{name}"), NodeKind::Other).unwrap();
        }
        let root = stage.node_at(&p("/R")).unwrap();
        let names: Vec<String> = stage
            .children(&root)
            .iter()
            .map(|c| c.path().name().to_string())
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn empty_relationship_is_a_block() {
        let mut stage = Stage::new();
        stage.define("/A", NodeKind::Other).unwrap();
        stage.set_relationship("/A", "rel", &[]).unwrap();
        let node = stage.node_at(&p("/A")).unwrap();
        assert!(stage.relationship(&node, "rel").is_blocked());
        stage.clear_relationship("/A", "rel").unwrap();
        assert!(stage.relationship(&node, "rel").is_unauthored());
    }

    #[test]
    fn instance_children_expand_from_prototype() {
        let stage = instanced_stage();
        let a = stage.node_at(&p("/Root/A")).unwrap();
        assert!(stage.is_instance(&a));
        assert_eq!(stage.prototype_of(&a), Some(p("/Proto")));

        let children = stage.children(&a);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path(), &p("/Root/A/Skel"));
        assert_eq!(children[0].source(), &p("/Proto/Skel"));
        let ctx = children[0].instance_context().unwrap();
        assert_eq!(ctx.occurrence, p("/Root/A"));
        assert_eq!(ctx.prototype, p("/Proto"));

        let proxy = stage.node_at(&p("/Root/B/Mesh")).unwrap();
        assert_eq!(proxy.source(), &p("/Proto/Mesh"));
        assert_eq!(proxy.instance_context().unwrap().occurrence, p("/Root/B"));
        assert_eq!(stage.kind(&proxy), NodeKind::Skinnable);
        assert!(stage.node_at(&p("/Root/B/Missing")).is_none());
    }

    #[test]
    fn nested_instances_report_innermost_context() {
        let mut stage = Stage::new();
        stage.define("/Inner", NodeKind::Other).unwrap();
        stage.define("/Inner/Skel", NodeKind::Skeleton).unwrap();
        stage.define("/Outer", NodeKind::Other).unwrap();
        stage.define("/Outer/Slot", NodeKind::Other).unwrap();
        stage.set_instance("/Outer/Slot", "/Inner").unwrap();
        stage.define("/Root", NodeKind::Root).unwrap();
        stage.define("/Root/I", NodeKind::Other).unwrap();
        stage.set_instance("/Root/I", "/Outer").unwrap();

        let node = stage.node_at(&p("/Root/I/Slot/Skel")).unwrap();
        assert_eq!(node.source(), &p("/Inner/Skel"));
        let ctx = node.instance_context().unwrap();
        assert_eq!(ctx.occurrence, p("/Root/I/Slot"));
        assert_eq!(ctx.prototype, p("/Inner"));

        let slot = stage.node_at(&p("/Root/I/Slot")).unwrap();
        let children = stage.children(&slot);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path(), &p("/Root/I/Slot/Skel"));
    }

    #[test]
    fn authoring_beneath_instances_is_rejected() {
        let mut stage = instanced_stage();
        assert_eq!(
            stage.define("/Root/A/Extra", NodeKind::Other),
            Err(StageError::BeneathInstance(p("/Root/A/Extra")))
        );
        assert_eq!(
            stage.define("/Root/A/Skel/Extra", NodeKind::Other),
            Err(StageError::BeneathInstance(p("/Root/A/Skel/Extra")))
        );
    }

    #[test]
    fn instancing_cycles_are_rejected() {
        let mut stage = Stage::new();
        stage.define("/P", NodeKind::Other).unwrap();
        stage.define("/P/Child", NodeKind::Other).unwrap();
        assert!(matches!(
            stage.set_instance("/P/Child", "/P"),
            Err(StageError::CyclicInstance { .. })
        ));

        stage.define("/Q", NodeKind::Other).unwrap();
        stage.define("/Q/Slot", NodeKind::Other).unwrap();
        stage.set_instance("/P/Child", "/Q").unwrap();
        assert!(matches!(
            stage.set_instance("/Q/Slot", "/P"),
            Err(StageError::CyclicInstance { .. })
        ));
    }

    #[test]
    fn instance_prim_falls_back_to_prototype_root_opinions() {
        let mut stage = instanced_stage();
        stage
            .set_relationship("/Proto", "skel:skeleton", &["/Proto/Skel"])
            .unwrap();
        stage
            .set_attribute("/Proto", "skel:joints", AttrValue::tokens(["proto"]))
            .unwrap();
        stage
            .set_attribute("/Root/B", "skel:joints", AttrValue::tokens(["own"]))
            .unwrap();

        let a = stage.node_at(&p("/Root/A")).unwrap();
        assert_eq!(
            stage.relationship(&a, "skel:skeleton"),
            Authored::Authored(vec![p("/Root/A/Skel")])
        );
        assert_eq!(
            stage.attribute(&a, "skel:joints"),
            Authored::Authored(AttrValue::tokens(["proto"]))
        );
        let b = stage.node_at(&p("/Root/B")).unwrap();
        assert_eq!(
            stage.attribute(&b, "skel:joints"),
            Authored::Authored(AttrValue::tokens(["own"]))
        );
    }

    #[test]
    fn failed_edits_leave_generation_alone() {
        let mut stage = instanced_stage();
        let before = stage.generation();
        assert_eq!(
            stage.set_active("/Missing", false),
            Err(StageError::MissingPrim(p("/Missing")))
        );
        assert!(stage.set_attribute("/Root/A/Skel", "joints", AttrValue::tokens(["a"])).is_err());
        assert!(stage.clear_relationship("/Nope", "rel").is_err());
        assert!(stage.set_instance("/Missing", "/Proto").is_err());
        assert_eq!(stage.generation(), before);

        stage.set_active("/Root/A", false).unwrap();
        assert!(stage.generation() > before);
    }

    #[test]
    fn remove_drops_subtree_and_bumps_generation() {
        let mut stage = instanced_stage();
        let before = stage.generation();
        assert_eq!(stage.remove("/Proto/Mesh").unwrap(), 1);
        assert!(stage.generation() > before);
        assert!(stage.node_at(&p("/Root/A/Mesh")).is_none());
        assert_eq!(stage.remove("/Root").unwrap(), 3);
        assert!(stage.prim(&p("/Root/A")).is_none());
        assert_eq!(stage.top_level().count(), 1);
    }

    #[test]
    fn active_in_hierarchy_considers_ancestors() {
        let mut stage = instanced_stage();
        stage.set_active("/Proto/Skel", false).unwrap();
        let skel = stage.node_at(&p("/Root/A/Skel")).unwrap();
        assert!(!stage.is_active_in_hierarchy(&skel));

        stage.set_active("/Proto/Skel", true).unwrap();
        stage.set_active("/Root", false).unwrap();
        let skel = stage.node_at(&p("/Root/A/Skel")).unwrap();
        assert!(!stage.is_active_in_hierarchy(&skel));
        let mesh = stage.node_at(&p("/Proto/Mesh")).unwrap();
        assert!(stage.is_active_in_hierarchy(&mesh));
    }
}
