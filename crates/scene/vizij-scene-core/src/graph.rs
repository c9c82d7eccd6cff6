//! Read-only scene graph interface consumed by skeleton binding.
//!
//! Nodes are addressed by [`NodeRef`], which pairs the occurrence path a
//! caller sees with the path of the prim that actually stores the data. The two
//! only differ inside instance occurrences, where many occurrence paths share
//! one prototype prim.

use crate::path::ScenePath;
use crate::prim::{AttrValue, Authored, NodeKind};

/// Innermost instance occurrence enclosing a node, and the prototype it shares.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceContext {
    /// Path of the instance node in the scene (outside the prototype).
    pub occurrence: ScenePath,
    /// Root of the prototype subtree the occurrence expands.
    pub prototype: ScenePath,
}

impl InstanceContext {
    /// Map a prototype-relative path into this occurrence. `None` when the path
    /// lies outside the prototype.
    pub fn to_occurrence(&self, path: &ScenePath) -> Option<ScenePath> {
        path.replace_prefix(&self.prototype, &self.occurrence)
    }

    /// True if `path` lies inside the prototype subtree.
    pub fn contains_prototype_path(&self, path: &ScenePath) -> bool {
        path.has_prefix(&self.prototype)
    }
}

/// Handle to one node of the scene, possibly an instance occurrence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef {
    path: ScenePath,
    source: ScenePath,
    instance: Option<InstanceContext>,
}

impl NodeRef {
    /// A node outside any instance occurrence.
    pub fn new(path: ScenePath) -> Self {
        Self {
            source: path.clone(),
            path,
            instance: None,
        }
    }

    /// A node inside an instance occurrence, backed by a prototype prim.
    pub fn in_occurrence(path: ScenePath, source: ScenePath, instance: InstanceContext) -> Self {
        Self {
            path,
            source,
            instance: Some(instance),
        }
    }

    /// Stable identity of the node: its occurrence path.
    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    /// Path of the prim that stores this node's data.
    pub fn source(&self) -> &ScenePath {
        &self.source
    }

    pub fn instance_context(&self) -> Option<&InstanceContext> {
        self.instance.as_ref()
    }

    /// True for nodes expanded from a prototype.
    pub fn is_instance_proxy(&self) -> bool {
        self.instance.is_some()
    }
}

/// Read-only, non-failing view of an externally owned scene graph.
///
/// Values are already composed: this interface reports what is authored on a
/// node, never what it inherits. Absence is reported with `None` or
/// [`Authored::Unauthored`] rather than errors.
pub trait SceneGraph {
    /// Look up a node by path. Occurrence paths inside instances resolve to
    /// proxies backed by the prototype.
    fn node_at(&self, path: &ScenePath) -> Option<NodeRef>;

    /// Children in their stable authored order.
    fn children(&self, node: &NodeRef) -> Vec<NodeRef>;

    fn kind(&self, node: &NodeRef) -> NodeKind;

    /// The node's own active flag (ancestors not considered).
    fn is_active(&self, node: &NodeRef) -> bool;

    fn relationship(&self, node: &NodeRef, name: &str) -> Authored<Vec<ScenePath>>;

    fn attribute(&self, node: &NodeRef, name: &str) -> Authored<AttrValue>;

    /// True if the node is an instance whose children come from a prototype.
    fn is_instance(&self, node: &NodeRef) -> bool;

    fn prototype_of(&self, node: &NodeRef) -> Option<ScenePath>;

    /// Counter bumped on every scene mutation. Graphs that never change may
    /// keep the default.
    fn generation(&self) -> u64 {
        0
    }

    /// Parent in occurrence space; `None` for top-level nodes.
    fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        let parent = node.path().parent()?;
        if parent.is_root() {
            return None;
        }
        self.node_at(&parent)
    }

    /// Active flag combined over the node and all of its ancestors.
    fn is_active_in_hierarchy(&self, node: &NodeRef) -> bool {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if !self.is_active(&n) {
                return false;
            }
            current = self.parent(&n);
        }
        true
    }
}
