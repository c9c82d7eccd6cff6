use vizij_scene_core::ScenePath;

use crate::skel_query::SkelQuery;
use crate::skinning_query::SkinningQuery;

/// A skeleton and the skinnable nodes bound to it within one populated root,
/// in discovery order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkelBinding {
    skeleton: SkelQuery,
    targets: Vec<SkinningQuery>,
}

impl SkelBinding {
    pub fn new(skeleton: SkelQuery, targets: Vec<SkinningQuery>) -> Self {
        Self { skeleton, targets }
    }

    pub fn is_valid(&self) -> bool {
        self.skeleton.is_valid()
    }

    pub fn skeleton(&self) -> &SkelQuery {
        &self.skeleton
    }

    pub fn skinning_targets(&self) -> &[SkinningQuery] {
        &self.targets
    }

    pub fn target_paths(&self) -> Vec<&ScenePath> {
        self.targets.iter().filter_map(SkinningQuery::path).collect()
    }
}
