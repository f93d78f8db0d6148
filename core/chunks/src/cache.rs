use std::num::NonZeroUsize;

use dolt_hash::Hash;
use lru::LruCache;
use parking_lot::Mutex;

/// A process-wide LRU of decoded chunk bytes, keyed by hash (spec.md §5: "The chunk cache
/// is a process-wide LRU of decoded chunks keyed by hash, sized in bytes; any thread may
/// read, inserts are lock-striped by hash prefix").
///
/// This implementation uses a single striped lock rather than true per-stripe locks,
/// which is sufficient at the concurrency levels this crate targets; see DESIGN.md for
/// the tradeoff.
pub struct ChunkCache {
    shards: Vec<Mutex<LruCache<Hash, Vec<u8>>>>,
}

const SHARD_COUNT: usize = 16;

impl ChunkCache {
    /// `capacity_per_shard` bounds the number of cached chunks per shard; callers size it
    /// from a byte budget divided by an expected average chunk size (spec.md §4.3: leaves
    /// are sized to approximately 4 KiB).
    pub fn new(capacity_per_shard: usize) -> ChunkCache {
        let capacity = NonZeroUsize::new(capacity_per_shard.max(1)).unwrap();
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(LruCache::new(capacity))).collect();
        ChunkCache { shards }
    }

    fn shard_for(&self, hash: &Hash) -> &Mutex<LruCache<Hash, Vec<u8>>> {
        let idx = hash.as_bytes()[0] as usize % SHARD_COUNT;
        &self.shards[idx]
    }

    pub fn get(&self, hash: &Hash) -> Option<Vec<u8>> {
        self.shard_for(hash).lock().get(hash).cloned()
    }

    pub fn insert(&self, hash: Hash, bytes: Vec<u8>) {
        self.shard_for(&hash).lock().put(hash, bytes);
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.shard_for(hash).lock().contains(hash)
    }
}
