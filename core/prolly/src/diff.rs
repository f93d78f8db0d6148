//! Row-level diff between two trees (spec.md §4.3, feeding §4.6's three-way merge).
//!
//! The only structural-sharing optimization taken here is the whole-tree short circuit:
//! equal root hashes mean no differences, full stop. Anything else falls back to
//! materializing both sides and merging the two sorted sequences; true synchronized descent
//! that skips matching subtrees partway down is a documented follow-up (DESIGN.md) rather
//! than implemented, since the item-level result is identical either way.

use std::cmp::Ordering;

use dolt_chunks::ChunkStore;
use dolt_codec::{compare_values, Value};

use crate::cursor::collect_all;
use crate::node::ChildRef;
use crate::ProllyError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffEntry {
    Added { key: Value, new: Value },
    Removed { key: Value, old: Value },
    Modified { key: Value, old: Value, new: Value },
}

impl DiffEntry {
    pub fn key(&self) -> &Value {
        match self {
            DiffEntry::Added { key, .. } => key,
            DiffEntry::Removed { key, .. } => key,
            DiffEntry::Modified { key, .. } => key,
        }
    }
}

/// Diffs `before` against `after`. Either side may be `None` (an empty tree).
pub fn diff(
    store: &dyn ChunkStore,
    before: Option<&ChildRef>,
    after: Option<&ChildRef>,
) -> Result<Vec<DiffEntry>, ProllyError> {
    match (before, after) {
        (None, None) => Ok(Vec::new()),
        (Some(b), Some(a)) if b.hash == a.hash => Ok(Vec::new()),
        _ => {
            let before_items = collect_all(store, before)?;
            let after_items = collect_all(store, after)?;
            Ok(merge_diff(before_items, after_items))
        }
    }
}

fn merge_diff(before: Vec<(Value, Value)>, after: Vec<(Value, Value)>) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    let mut bi = before.into_iter().peekable();
    let mut ai = after.into_iter().peekable();
    loop {
        match (bi.peek(), ai.peek()) {
            (None, None) => break,
            (Some(_), None) => {
                let (key, old) = bi.next().unwrap();
                out.push(DiffEntry::Removed { key, old });
            }
            (None, Some(_)) => {
                let (key, new) = ai.next().unwrap();
                out.push(DiffEntry::Added { key, new });
            }
            (Some((bk, _)), Some((ak, _))) => match compare_values(bk, ak) {
                Ordering::Less => {
                    let (key, old) = bi.next().unwrap();
                    out.push(DiffEntry::Removed { key, old });
                }
                Ordering::Greater => {
                    let (key, new) = ai.next().unwrap();
                    out.push(DiffEntry::Added { key, new });
                }
                Ordering::Equal => {
                    let (key, old) = bi.next().unwrap();
                    let (_, new) = ai.next().unwrap();
                    if old != new {
                        out.push(DiffEntry::Modified { key, old, new });
                    }
                }
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_tree;
    use dolt_chunks::MemoryStore;
    use dolt_codec::Number;

    fn kv(n: i64) -> (Value, Value) {
        (Value::Number(Number::from_i64(n)), Value::String(format!("v{n}")))
    }

    #[test]
    fn identical_roots_short_circuit_to_empty_diff() {
        let store = MemoryStore::new();
        let items: Vec<_> = (0..10).map(kv).collect();
        let root = build_tree(&store, items).unwrap();
        let entries = diff(&store, root.as_ref(), root.as_ref()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn detects_added_removed_and_modified() {
        let store = MemoryStore::new();
        let before_items: Vec<_> = vec![kv(1), kv(2), kv(3)];
        let mut after_items = vec![kv(1), (Value::Number(Number::from_i64(2)), Value::String("changed".to_string()))];
        after_items.push(kv(4));
        let before = build_tree(&store, before_items).unwrap();
        let after = build_tree(&store, after_items).unwrap();

        let mut entries = diff(&store, before.as_ref(), after.as_ref()).unwrap();
        entries.sort_by(|a, b| compare_values(a.key(), b.key()));

        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], DiffEntry::Modified { old, new, .. } if old != new));
        assert!(matches!(entries[1], DiffEntry::Removed { .. }));
        assert!(matches!(entries[2], DiffEntry::Added { .. }));
    }

    #[test]
    fn diff_against_empty_tree_is_all_additions() {
        let store = MemoryStore::new();
        let items: Vec<_> = (0..5).map(kv).collect();
        let root = build_tree(&store, items).unwrap();
        let entries = diff(&store, None, root.as_ref()).unwrap();
        assert_eq!(entries.len(), 5);
        assert!(entries.iter().all(|e| matches!(e, DiffEntry::Added { .. })));
    }

    /// spec.md §8 Testable Property 4: applying `Diff(a, b)` as edits onto `a` reproduces
    /// `b`'s root.
    #[test]
    fn diff_reconstructs_the_after_tree_when_applied_as_edits() {
        use crate::tree::Tree;

        let store = MemoryStore::new();
        let before_items: Vec<_> = vec![kv(1), kv(2), kv(3), kv(5)];
        let mut after_items = vec![kv(1), (Value::Number(Number::from_i64(2)), Value::String("changed".to_string()))];
        after_items.push(kv(4));
        after_items.push(kv(5));

        let before_root = build_tree(&store, before_items).unwrap();
        let after_root = build_tree(&store, after_items).unwrap();

        let entries = diff(&store, before_root.as_ref(), after_root.as_ref()).unwrap();
        let edits: Vec<(Value, Option<Value>)> = entries
            .into_iter()
            .map(|e| match e {
                DiffEntry::Added { key, new } => (key, Some(new)),
                DiffEntry::Modified { key, new, .. } => (key, Some(new)),
                DiffEntry::Removed { key, .. } => (key, None),
            })
            .collect();

        let before_tree = Tree::from_root(&store, before_root);
        let reconstructed = before_tree.edit(edits).unwrap();
        assert_eq!(reconstructed.root_hash(), after_root.map(|r| r.hash));
    }
}
