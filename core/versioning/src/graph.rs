//! Commit-graph operations (spec.md §4.5): `CommitIterator`, `MergeBase`, `Ancestor`. All
//! are read-only and wait-free relative to writers (spec.md §5).

use std::collections::{HashSet, VecDeque};

use dolt_chunks::ChunkStore;
use dolt_hash::Hash;

use crate::commit::{decode_commit, Commit};
use crate::VersioningError;

fn load_commit(store: &dyn ChunkStore, hash: Hash) -> Result<Commit, VersioningError> {
    let bytes = store.get(&hash)?;
    Ok(decode_commit(&bytes)?)
}

/// Yields commits from `start` in first-parent order (spec.md §4.5: "yields commits in
/// first-parent order").
pub struct CommitIterator<'s> {
    store: &'s dyn ChunkStore,
    next: Option<Hash>,
}

impl<'s> CommitIterator<'s> {
    pub fn new(store: &'s dyn ChunkStore, start: Hash) -> CommitIterator<'s> {
        CommitIterator { store, next: Some(start) }
    }
}

impl<'s> Iterator for CommitIterator<'s> {
    type Item = Result<(Hash, Commit), VersioningError>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        match load_commit(self.store, hash) {
            Ok(commit) => {
                self.next = commit.parents.first().copied();
                Some(Ok((hash, commit)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Lowest common ancestor of `a` and `b` by breadth-first search of the full ancestor DAG
/// (every parent, not just first-parent) on both sides simultaneously, maintaining
/// per-side visited sets and returning the first hash to appear in both; ties (multiple
/// candidates surface at the same BFS depth) are broken by the smaller hash (spec.md
/// §4.5).
pub fn merge_base(store: &dyn ChunkStore, a: Hash, b: Hash) -> Result<Option<Hash>, VersioningError> {
    let mut visited_a: HashSet<Hash> = HashSet::new();
    let mut visited_b: HashSet<Hash> = HashSet::new();
    let mut frontier_a: VecDeque<Hash> = VecDeque::from([a]);
    let mut frontier_b: VecDeque<Hash> = VecDeque::from([b]);

    loop {
        if frontier_a.is_empty() && frontier_b.is_empty() {
            return Ok(None);
        }

        let mut candidates = Vec::new();

        let mut next_a = VecDeque::new();
        for hash in frontier_a.drain(..) {
            if !visited_a.insert(hash) {
                continue;
            }
            if visited_b.contains(&hash) {
                candidates.push(hash);
                continue;
            }
            next_a.extend(load_commit(store, hash)?.parents);
        }

        let mut next_b = VecDeque::new();
        for hash in frontier_b.drain(..) {
            if !visited_b.insert(hash) {
                continue;
            }
            if visited_a.contains(&hash) {
                candidates.push(hash);
                continue;
            }
            next_b.extend(load_commit(store, hash)?.parents);
        }

        if let Some(best) = candidates.into_iter().min() {
            return Ok(Some(best));
        }

        frontier_a = next_a;
        frontier_b = next_b;
    }
}

/// The three ancestor-reference forms of spec.md §4.5: `h^` (first parent, one hop), `h~N`
/// (first-parent walk N times), `h@{N}` (N-th reflog entry for the ref `h` was resolved
/// from — the reflog itself is supplied by the caller, since this crate does not persist
/// one; see DESIGN.md).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AncestorSpec {
    FirstParent,
    NthAncestor(u32),
    ReflogEntry(u32),
}

/// Resolves `spec` relative to `head`. `reflog` is the caller's ordered history of values
/// a ref has pointed to (most recent first), only consulted for `ReflogEntry`.
pub fn resolve_ancestor(
    store: &dyn ChunkStore,
    head: Hash,
    spec: AncestorSpec,
    reflog: &[Hash],
) -> Result<Option<Hash>, VersioningError> {
    match spec {
        AncestorSpec::FirstParent => Ok(load_commit(store, head)?.parents.first().copied()),
        AncestorSpec::NthAncestor(n) => {
            let mut current = head;
            for _ in 0..n {
                match load_commit(store, current)?.parents.first().copied() {
                    Some(parent) => current = parent,
                    None => return Ok(None),
                }
            }
            Ok(Some(current))
        }
        AncestorSpec::ReflogEntry(n) => Ok(reflog.get(n as usize).copied()),
    }
}
