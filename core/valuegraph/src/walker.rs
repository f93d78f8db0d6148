//! Transitive chunk closure from a set of roots (spec.md §4.2, §4.4).

use std::collections::HashSet;

use dolt_chunks::ChunkStore;
use dolt_hash::Hash;

use crate::ValueGraphError;

/// Knows how to pull the child hashes out of one chunk's bytes. Implementations are
/// per-layer (spec.md §4.1's commit/root-value/table shapes vs. §4.3's prolly node shapes);
/// [`crate::ProllyChildExtractor`] is the one every table-data chunk in this repo uses.
pub trait ChildExtractor: Send + Sync {
    fn children(&self, hash: Hash, bytes: &[u8]) -> Result<Vec<Hash>, ValueGraphError>;
}

pub struct Walker<'s> {
    store: &'s dyn ChunkStore,
    extractor: &'s dyn ChildExtractor,
}

impl<'s> Walker<'s> {
    pub fn new(store: &'s dyn ChunkStore, extractor: &'s dyn ChildExtractor) -> Walker<'s> {
        Walker { store, extractor }
    }

    /// Computes the full set of chunks reachable from `roots`, following [`ChildExtractor`]
    /// edges. Hash-keyed dedup means a diamond-shaped reference graph is visited once per
    /// chunk no matter how many parents share it (spec.md §4.2: "structural sharing across
    /// revisions").
    pub fn closure(&self, roots: impl IntoIterator<Item = Hash>) -> Result<HashSet<Hash>, ValueGraphError> {
        let mut seen = HashSet::new();
        let mut stack: Vec<Hash> = roots.into_iter().filter(|h| !h.is_empty()).collect();
        while let Some(hash) = stack.pop() {
            if !seen.insert(hash) {
                continue;
            }
            let bytes = self.store.get(&hash)?;
            for child in self.extractor.children(hash, &bytes)? {
                if !child.is_empty() && !seen.contains(&child) {
                    stack.push(child);
                }
            }
        }
        Ok(seen)
    }
}
