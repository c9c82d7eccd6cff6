//! Cache configuration.

use serde::{Deserialize, Serialize};

/// Configuration fixed when a [`SkelCache`](crate::SkelCache) is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Traverse instance occurrences during population. When false an instance
    /// node is visited like any other node but its expanded children are not.
    pub include_instances: bool,

    /// Worker threads used to walk the root's children. `1` walks
    /// sequentially; `0` uses [`std::thread::available_parallelism`].
    pub worker_threads: usize,

    /// Fewest root children for which a parallel walk is attempted.
    pub min_parallel_children: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            include_instances: false,
            worker_threads: 1,
            min_parallel_children: 4,
        }
    }
}

impl CacheConfig {
    pub fn with_instances(include_instances: bool) -> Self {
        Self {
            include_instances,
            ..Self::default()
        }
    }

    pub(crate) fn effective_threads(&self) -> usize {
        match self.worker_threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}
