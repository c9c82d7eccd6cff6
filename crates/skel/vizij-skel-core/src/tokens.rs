//! Relationship and attribute names read by skeleton binding.

/// Skeleton bound to skinnable geometry. Inherited.
pub const SKEL_SKELETON: &str = "skel:skeleton";
/// Animation driving a skeleton. Inherited.
pub const SKEL_ANIMATION_SOURCE: &str = "skel:animationSource";
/// Blend shape target prims of a skinnable. Node-local.
pub const SKEL_BLEND_SHAPE_TARGETS: &str = "skel:blendShapeTargets";

/// Per-point joint indices. Inherited.
pub const JOINT_INDICES: &str = "primvars:skel:jointIndices";
/// Per-point joint weights. Inherited.
pub const JOINT_WEIGHTS: &str = "primvars:skel:jointWeights";
/// Joint order used by a skinnable's influences. Inherited.
pub const SKEL_JOINTS: &str = "skel:joints";
/// Blend shape names of a skinnable. Node-local.
pub const SKEL_BLEND_SHAPES: &str = "skel:blendShapes";

/// Joint order of a skeleton or an animation. Node-local.
pub const JOINTS: &str = "joints";
/// Blend shape order of an animation. Node-local.
pub const BLEND_SHAPES: &str = "blendShapes";
