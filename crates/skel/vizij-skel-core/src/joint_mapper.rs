//! Remapping of per-joint data between joint orders.

use hashbrown::HashMap;

/// Maps arrays ordered by a source joint order onto a target joint order.
///
/// Source joints missing from the target order are dropped; target joints
/// missing from the source order receive a caller-supplied default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JointMapper {
    /// Target index for every source index.
    map: Vec<Option<usize>>,
    target_len: usize,
    identity: bool,
    sparse: bool,
}

impl JointMapper {
    pub fn new<A, B>(source: &[A], target: &[B]) -> Self
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let positions: HashMap<&str, usize> = target
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_ref(), i))
            .collect();
        let map: Vec<Option<usize>> = source
            .iter()
            .map(|name| positions.get(name.as_ref()).copied())
            .collect();

        let identity = source.len() == target.len()
            && map.iter().enumerate().all(|(i, t)| *t == Some(i));
        let mapped = map.iter().filter(|t| t.is_some()).count();
        Self {
            map,
            target_len: target.len(),
            identity,
            sparse: mapped < target.len(),
        }
    }

    /// Source and target orders are the same.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Some target joints receive no value from the source.
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    pub fn source_len(&self) -> usize {
        self.map.len()
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn map_index(&self, source_index: usize) -> Option<usize> {
        self.map.get(source_index).copied().flatten()
    }

    /// Reorder one value per source joint into target order.
    pub fn remap<T: Clone>(&self, values: &[T], default: T) -> Vec<T> {
        self.remap_elements(values, 1, default)
    }

    /// Like [`remap`](Self::remap) with `element_size` consecutive values per
    /// joint. Trailing values that do not fill a whole element are ignored.
    pub fn remap_elements<T: Clone>(&self, values: &[T], element_size: usize, default: T) -> Vec<T> {
        let element_size = element_size.max(1);
        if self.identity && values.len() == self.target_len * element_size {
            return values.to_vec();
        }
        let mut out = vec![default; self.target_len * element_size];
        for (source, chunk) in values.chunks_exact(element_size).enumerate() {
            if let Some(target) = self.map_index(source) {
                let start = target * element_size;
                out[start..start + element_size].clone_from_slice(chunk);
            }
        }
        out
    }
}
