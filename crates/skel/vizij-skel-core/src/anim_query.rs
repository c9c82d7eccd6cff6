use std::sync::Arc;

use vizij_scene_core::{NodeKind, NodeRef, SceneGraph, ScenePath};

use crate::resolver::TargetOrigin;
use crate::tokens;

#[derive(Debug, PartialEq)]
struct AnimQueryData {
    path: ScenePath,
    source: ScenePath,
    origin: TargetOrigin,
    joint_order: Vec<String>,
    blend_shape_order: Vec<String>,
}

/// View of an animation node. Invalid when the node is missing, is not an
/// animation, or is inactive (itself or through an ancestor).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimQuery {
    inner: Option<Arc<AnimQueryData>>,
}

pub(crate) static INVALID_ANIM_QUERY: AnimQuery = AnimQuery { inner: None };

impl AnimQuery {
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn from_node<S: SceneGraph + ?Sized>(
        scene: &S,
        node: &NodeRef,
        origin: TargetOrigin,
    ) -> Self {
        if scene.kind(node) != NodeKind::Animation || !scene.is_active_in_hierarchy(node) {
            return Self::invalid();
        }
        let tokens_of = |name: &str| {
            scene
                .attribute(node, name)
                .value()
                .and_then(|v| v.as_tokens())
                .map(<[String]>::to_vec)
                .unwrap_or_default()
        };
        Self {
            inner: Some(Arc::new(AnimQueryData {
                path: node.path().clone(),
                source: node.source().clone(),
                origin,
                joint_order: tokens_of(tokens::JOINTS),
                blend_shape_order: tokens_of(tokens::BLEND_SHAPES),
            })),
        }
    }

    pub fn from_path<S: SceneGraph + ?Sized>(
        scene: &S,
        path: &ScenePath,
        origin: TargetOrigin,
    ) -> Self {
        match scene.node_at(path) {
            Some(node) => Self::from_node(scene, &node, origin),
            None => Self::invalid(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    pub fn path(&self) -> Option<&ScenePath> {
        self.inner.as_ref().map(|d| &d.path)
    }

    /// Prim storing the animation; differs from [`path`](Self::path) for
    /// animations inside an instance occurrence.
    pub fn source(&self) -> Option<&ScenePath> {
        self.inner.as_ref().map(|d| &d.source)
    }

    pub fn origin(&self) -> Option<&TargetOrigin> {
        self.inner.as_ref().map(|d| &d.origin)
    }

    pub fn is_prototype_local(&self) -> bool {
        matches!(self.origin(), Some(TargetOrigin::PrototypeLocal { .. }))
    }

    pub fn joint_order(&self) -> &[String] {
        self.inner
            .as_ref()
            .map(|d| d.joint_order.as_slice())
            .unwrap_or(&[])
    }

    pub fn blend_shape_order(&self) -> &[String] {
        self.inner
            .as_ref()
            .map(|d| d.blend_shape_order.as_slice())
            .unwrap_or(&[])
    }
}
