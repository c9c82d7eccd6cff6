use std::sync::Arc;

use vizij_scene_core::{AttrValue, NodeRef, ScenePath};

use crate::joint_mapper::JointMapper;
use crate::resolver::{ResolvedAttr, ResolvedTarget};

/// Everything a skinnable node contributes to a binding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinningData {
    pub skeleton: ScenePath,
    /// Inherited.
    pub joint_indices: Option<ResolvedAttr>,
    /// Inherited.
    pub joint_weights: Option<ResolvedAttr>,
    /// Inherited.
    pub joint_order: Option<ResolvedAttr>,
    /// Node-local.
    pub blend_shapes: Option<AttrValue>,
    /// Node-local.
    pub blend_shape_targets: Vec<ResolvedTarget>,
}

#[derive(Debug, PartialEq)]
struct SkinningQueryData {
    path: ScenePath,
    source: ScenePath,
    data: SkinningData,
    joint_mapper: Option<JointMapper>,
}

/// View of a skinnable node bound to a skeleton.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinningQuery {
    inner: Option<Arc<SkinningQueryData>>,
}

impl SkinningQuery {
    pub fn invalid() -> Self {
        Self::default()
    }

    /// `skeleton_joints` is the bound skeleton's joint order; a mapper is
    /// built when the node authors (or inherits) its own joint order.
    pub fn new(node: &NodeRef, data: SkinningData, skeleton_joints: &[String]) -> Self {
        let joint_mapper = data
            .joint_order
            .as_ref()
            .and_then(|attr| attr.value.as_tokens())
            .map(|order| JointMapper::new(order, skeleton_joints));
        Self {
            inner: Some(Arc::new(SkinningQueryData {
                path: node.path().clone(),
                source: node.source().clone(),
                data,
                joint_mapper,
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

    fn data(&self) -> Option<&SkinningData> {
        self.inner.as_ref().map(|d| &d.data)
    }

    pub fn skeleton(&self) -> Option<&ScenePath> {
        self.data().map(|d| &d.skeleton)
    }

    pub fn joint_indices(&self) -> Option<&ResolvedAttr> {
        self.data().and_then(|d| d.joint_indices.as_ref())
    }

    pub fn joint_weights(&self) -> Option<&ResolvedAttr> {
        self.data().and_then(|d| d.joint_weights.as_ref())
    }

    /// Joint weights as floats, whether authored as float or integer values.
    pub fn joint_weight_values(&self) -> Option<Vec<f64>> {
        self.joint_weights().and_then(|attr| attr.value.to_floats())
    }

    pub fn joint_order(&self) -> Option<&[String]> {
        self.data()
            .and_then(|d| d.joint_order.as_ref())
            .and_then(|attr| attr.value.as_tokens())
    }

    /// Node the joint order was inherited from.
    pub fn joint_order_source(&self) -> Option<&ScenePath> {
        self.data()
            .and_then(|d| d.joint_order.as_ref())
            .map(|attr| &attr.source)
    }

    pub fn blend_shapes(&self) -> Option<&[String]> {
        self.data()
            .and_then(|d| d.blend_shapes.as_ref())
            .and_then(AttrValue::as_tokens)
    }

    pub fn blend_shape_targets(&self) -> &[ResolvedTarget] {
        self.data()
            .map(|d| d.blend_shape_targets.as_slice())
            .unwrap_or(&[])
    }

    /// Maps this node's joint order onto the skeleton's, when it has one.
    pub fn joint_mapper(&self) -> Option<&JointMapper> {
        self.inner.as_ref().and_then(|d| d.joint_mapper.as_ref())
    }

    pub fn has_joint_influences(&self) -> bool {
        self.joint_indices().is_some() && self.joint_weights().is_some()
    }

    pub fn has_blend_shapes(&self) -> bool {
        self.blend_shapes().is_some() && !self.blend_shape_targets().is_empty()
    }
}
