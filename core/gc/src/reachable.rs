//! The reachable set built by the mark phase (spec.md §4.7: "record each visited hash in
//! an on-disk bloom-filter-backed set (exact set if memory permits)").
//!
//! Only the exact backend is implemented here. A bloom-filter backend would trade a small
//! false-positive rate (a handful of chunks swept-in that are actually garbage, never a
//! live chunk swept away) for bounded memory on very large repositories; see DESIGN.md.

use std::collections::HashSet;

use dolt_hash::Hash;

pub trait ReachableSet: Send + Sync {
    fn contains(&self, hash: &Hash) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Clone)]
pub struct ExactReachableSet {
    hashes: HashSet<Hash>,
}

impl ExactReachableSet {
    pub fn new(hashes: HashSet<Hash>) -> ExactReachableSet {
        ExactReachableSet { hashes }
    }

    pub fn as_hash_set(&self) -> &HashSet<Hash> {
        &self.hashes
    }
}

impl ReachableSet for ExactReachableSet {
    fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    fn len(&self) -> usize {
        self.hashes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_set_reports_membership() {
        let present = Hash::of_bytes(b"present");
        let absent = Hash::of_bytes(b"absent");
        let set = ExactReachableSet::new([present].into_iter().collect());
        assert!(set.contains(&present));
        assert!(!set.contains(&absent));
        assert_eq!(set.len(), 1);
    }
}
