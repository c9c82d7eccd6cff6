//! Identifiers for prims stored in a [`Stage`](crate::Stage).

use serde::{Deserialize, Serialize};

/// Dense arena index of a prim. Indices of removed prims are never reused, so a
/// stale id simply fails to resolve.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimId(pub u32);

impl PrimId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Monotonic allocator for PrimId.
#[derive(Default, Debug, Clone)]
pub struct PrimIdAllocator {
    next: u32,
}

impl PrimIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self) -> PrimId {
        let id = PrimId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}
