use std::hash::Hasher as _;

use hash32::{FnvHasher, Hasher as _};

/// Picks one endpoint of a shard ring for a metric key.
///
/// Implementations must be deterministic and stable: the same `(ring, key)`
/// pair always yields the same endpoint, and small ring changes should only
/// relocate a small fraction of keys (the usual consistent-hashing
/// contract). The relay treats the selection algorithm as a black box;
/// deployments plug in their ring implementation here.
pub trait ShardSelector: Send + Sync {
    /// Returns the index of the selected endpoint in `ring`.
    ///
    /// Returns `None` when the ring is empty.
    fn select_shard(&self, ring: &[String], key: &[u8]) -> Option<usize>;
}

/// Baseline selector hashing the key onto the ring with FNV-1a.
///
/// Deterministic and uniform, but a plain modulo mapping: resizing the ring
/// relocates most keys. Suitable for static rings and for tests; rings that
/// resize under traffic want a proper consistent-hash implementation of
/// [`ShardSelector`] instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct FnvShardSelector;

impl ShardSelector for FnvShardSelector {
    fn select_shard(&self, ring: &[String], key: &[u8]) -> Option<usize> {
        if ring.is_empty() {
            return None;
        }
        let mut hasher = FnvHasher::default();
        hasher.write(key);
        Some(hasher.finish32() as usize % ring.len())
    }
}
