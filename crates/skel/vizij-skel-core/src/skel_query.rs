use std::sync::Arc;

use vizij_scene_core::{NodeKind, NodeRef, SceneGraph, ScenePath};

use crate::anim_query::{AnimQuery, INVALID_ANIM_QUERY};
use crate::joint_mapper::JointMapper;
use crate::tokens;

#[derive(Debug, PartialEq)]
struct SkelQueryData {
    path: ScenePath,
    source: ScenePath,
    joint_order: Vec<String>,
    anim: AnimQuery,
    /// Present when the animation is valid and authors a joint order.
    anim_mapper: Option<JointMapper>,
}

/// View of a skeleton node and the animation bound to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkelQuery {
    inner: Option<Arc<SkelQueryData>>,
}

impl SkelQuery {
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Build a query for `node`. Invalid unless the node is an active skeleton.
    pub fn from_node<S: SceneGraph + ?Sized>(scene: &S, node: &NodeRef, anim: AnimQuery) -> Self {
        if scene.kind(node) != NodeKind::Skeleton || !scene.is_active_in_hierarchy(node) {
            return Self::invalid();
        }
        let joint_order = scene
            .attribute(node, tokens::JOINTS)
            .value()
            .and_then(|v| v.as_tokens())
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let anim_mapper = (anim.is_valid() && !anim.joint_order().is_empty())
            .then(|| JointMapper::new(anim.joint_order(), joint_order.as_slice()));
        Self {
            inner: Some(Arc::new(SkelQueryData {
                path: node.path().clone(),
                source: node.source().clone(),
                joint_order,
                anim,
                anim_mapper,
            })),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    pub fn path(&self) -> Option<&ScenePath> {
        self.inner.as_ref().map(|d| &d.path)
    }

    pub fn source(&self) -> Option<&ScenePath> {
        self.inner.as_ref().map(|d| &d.source)
    }

    pub fn joint_order(&self) -> &[String] {
        self.inner
            .as_ref()
            .map(|d| d.joint_order.as_slice())
            .unwrap_or(&[])
    }

    /// Bound animation; invalid when unbound, blocked or pointing at something
    /// that is not an active animation.
    pub fn anim_query(&self) -> &AnimQuery {
        self.inner
            .as_ref()
            .map(|d| &d.anim)
            .unwrap_or(&INVALID_ANIM_QUERY)
    }

    /// Maps animation-ordered joint data onto this skeleton's joint order.
    pub fn anim_mapper(&self) -> Option<&JointMapper> {
        self.inner.as_ref().and_then(|d| d.anim_mapper.as_ref())
    }
}
