//! The `Tree` API (spec.md §4.3): `Get`, `Has`, `First`, `Last`, `Len`, `IteratorAt`,
//! `Edit`, `Diff`.

use std::cmp::Ordering;

use dolt_chunks::ChunkStore;
use dolt_codec::{compare_values, Value};
use dolt_hash::Hash;

use crate::build::build_tree;
use crate::cursor::{collect_all, Cursor};
use crate::diff::{diff as diff_trees, DiffEntry};
use crate::node::{decode_node, ChildRef, Node};
use crate::ProllyError;

/// An immutable, persistent ordered `Value -> Value` map, backed by chunks in a
/// [`ChunkStore`]. `Tree` is a thin handle: cloning it is cheap, and every mutating
/// operation ([`Tree::edit`]) returns a new handle rather than touching `self`.
#[derive(Clone)]
pub struct Tree<'s> {
    store: &'s dyn ChunkStore,
    root: Option<ChildRef>,
}

impl<'s> Tree<'s> {
    pub fn empty(store: &'s dyn ChunkStore) -> Tree<'s> {
        Tree { store, root: None }
    }

    pub fn from_root(store: &'s dyn ChunkStore, root: Option<ChildRef>) -> Tree<'s> {
        Tree { store, root }
    }

    /// Opens an existing tree from its root hash, reading just the root chunk to recover
    /// height and item count (spec.md §4.3: "`Len()` is O(1) from the root's cumulative
    /// count"). Callers that already carry a `RefValue` with height/count (spec.md §4.1)
    /// should prefer [`Tree::from_root`], which avoids this read entirely.
    pub fn open(store: &'s dyn ChunkStore, hash: Hash) -> Result<Tree<'s>, ProllyError> {
        let node = decode_node(&store.get(&hash)?)?;
        let root = ChildRef { hash, height: node.height(), count: node.item_count() };
        Ok(Tree { store, root: Some(root) })
    }

    pub fn root_ref(&self) -> Option<&ChildRef> {
        self.root.as_ref()
    }

    pub fn root_hash(&self) -> Option<Hash> {
        self.root.as_ref().map(|r| r.hash)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// O(1): the root ref carries its subtree's total item count.
    pub fn len(&self) -> u64 {
        self.root.as_ref().map(|r| r.count).unwrap_or(0)
    }

    pub fn height(&self) -> u64 {
        self.root.as_ref().map(|r| r.height).unwrap_or(0)
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>, ProllyError> {
        let Some(root) = &self.root else { return Ok(None) };
        get_in(self.store, root, key)
    }

    pub fn has(&self, key: &Value) -> Result<bool, ProllyError> {
        Ok(self.get(key)?.is_some())
    }

    pub fn first(&self) -> Result<Option<(Value, Value)>, ProllyError> {
        let Some(root) = &self.root else { return Ok(None) };
        edge(self.store, root, Edge::First)
    }

    pub fn last(&self) -> Result<Option<(Value, Value)>, ProllyError> {
        let Some(root) = &self.root else { return Ok(None) };
        edge(self.store, root, Edge::Last)
    }

    /// A forward cursor starting at the first item whose key is `>= key`, or at the first
    /// item if `key` is `None`.
    pub fn iter_at(&self, key: Option<&Value>) -> Result<Cursor<'s>, ProllyError> {
        Cursor::seek(self.store, self.root.as_ref(), key)
    }

    /// Applies a batch of edits (`Some(value)` inserts/updates, `None` deletes) and returns
    /// the resulting tree. Duplicate keys within `edits` resolve last-wins, matching the
    /// order they appear in the slice (spec.md §4.3, §8 Testable Property 2). Because the
    /// new tree is rebuilt from its full resulting content rather than patched in place,
    /// the result depends only on the final key set, not on edit order (Testable Property
    /// 3) — and unchanged leaves re-chunk identically to the original, so storage is shared
    /// rather than duplicated.
    pub fn edit(&self, edits: Vec<(Value, Option<Value>)>) -> Result<Tree<'s>, ProllyError> {
        let existing = collect_all(self.store, self.root.as_ref())?;
        let merged = apply_edits(existing, edits);
        let root = build_tree(self.store, merged)?;
        Ok(Tree { store: self.store, root })
    }

    pub fn diff(&self, other: &Tree<'s>) -> Result<Vec<DiffEntry>, ProllyError> {
        diff_trees(self.store, self.root.as_ref(), other.root.as_ref())
    }
}

fn get_in(store: &dyn ChunkStore, child: &ChildRef, key: &Value) -> Result<Option<Value>, ProllyError> {
    let node = decode_node(&store.get(&child.hash)?)?;
    match node {
        Node::Leaf(entries) => Ok(entries
            .into_iter()
            .find(|(k, _)| compare_values(k, key) == Ordering::Equal)
            .map(|(_, v)| v)),
        Node::Internal { last_keys, children, .. } => {
            let idx = last_keys.partition_point(|lk| compare_values(lk, key) == Ordering::Less);
            match children.get(idx) {
                Some(child) => get_in(store, child, key),
                None => Ok(None),
            }
        }
    }
}

enum Edge {
    First,
    Last,
}

fn edge(store: &dyn ChunkStore, child: &ChildRef, which: Edge) -> Result<Option<(Value, Value)>, ProllyError> {
    let node = decode_node(&store.get(&child.hash)?)?;
    match node {
        Node::Leaf(entries) => Ok(match which {
            Edge::First => entries.into_iter().next(),
            Edge::Last => entries.into_iter().last(),
        }),
        Node::Internal { children, .. } => {
            let next = match which {
                Edge::First => children.first(),
                Edge::Last => children.last(),
            };
            match next {
                Some(next) => edge(store, next, which),
                None => Ok(None),
            }
        }
    }
}

/// Merges a sorted, unique `existing` sequence with a (possibly unsorted, possibly
/// duplicate-keyed) batch of `edits`, last-wins on duplicate keys, `None` deleting.
fn apply_edits(
    existing: Vec<(Value, Value)>,
    edits: Vec<(Value, Option<Value>)>,
) -> Vec<(Value, Value)> {
    let mut indexed: Vec<(usize, Value, Option<Value>)> =
        edits.into_iter().enumerate().map(|(i, (k, v))| (i, k, v)).collect();
    indexed.sort_by(|a, b| compare_values(&a.1, &b.1).then(a.0.cmp(&b.0)));

    let mut collapsed: Vec<(Value, Option<Value>)> = Vec::with_capacity(indexed.len());
    for (_, key, value) in indexed {
        match collapsed.last_mut() {
            Some(last) if compare_values(&last.0, &key) == Ordering::Equal => *last = (key, value),
            _ => collapsed.push((key, value)),
        }
    }

    let mut out = Vec::with_capacity(existing.len() + collapsed.len());
    let mut ei = existing.into_iter().peekable();
    let mut di = collapsed.into_iter().peekable();
    loop {
        match (ei.peek(), di.peek()) {
            (None, None) => break,
            (Some(_), None) => out.push(ei.next().unwrap()),
            (None, Some(_)) => {
                if let (k, Some(v)) = di.next().unwrap() {
                    out.push((k, v));
                }
            }
            (Some((ek, _)), Some((dk, _))) => match compare_values(ek, dk) {
                Ordering::Less => out.push(ei.next().unwrap()),
                Ordering::Greater => {
                    if let (k, Some(v)) = di.next().unwrap() {
                        out.push((k, v));
                    }
                }
                Ordering::Equal => {
                    ei.next();
                    if let (k, Some(v)) = di.next().unwrap() {
                        out.push((k, v));
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
    use dolt_chunks::MemoryStore;
    use dolt_codec::Number;

    fn v(n: i64) -> Value {
        Value::Number(Number::from_i64(n))
    }

    #[test]
    fn empty_tree_basics() {
        let store = MemoryStore::new();
        let tree = Tree::empty(&store);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.get(&v(1)).unwrap(), None);
        assert_eq!(tree.first().unwrap(), None);
        assert_eq!(tree.last().unwrap(), None);
    }

    #[test]
    fn edit_inserts_updates_and_deletes() {
        let store = MemoryStore::new();
        let tree = Tree::empty(&store);
        let tree = tree
            .edit(vec![
                (v(1), Some(Value::String("a".to_string()))),
                (v(2), Some(Value::String("b".to_string()))),
                (v(3), Some(Value::String("c".to_string()))),
            ])
            .unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(&v(2)).unwrap(), Some(Value::String("b".to_string())));

        let tree = tree
            .edit(vec![(v(2), Some(Value::String("b2".to_string()))), (v(3), None)])
            .unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(&v(2)).unwrap(), Some(Value::String("b2".to_string())));
        assert_eq!(tree.get(&v(3)).unwrap(), None);
    }

    #[test]
    fn duplicate_keys_in_one_batch_resolve_last_wins() {
        let store = MemoryStore::new();
        let tree = Tree::empty(&store);
        let tree = tree
            .edit(vec![
                (v(1), Some(Value::String("first".to_string()))),
                (v(1), Some(Value::String("second".to_string()))),
            ])
            .unwrap();
        assert_eq!(tree.get(&v(1)).unwrap(), Some(Value::String("second".to_string())));
    }

    #[test]
    fn edit_order_does_not_affect_final_root_hash() {
        let store_a = MemoryStore::new();
        let store_b = MemoryStore::new();
        let a = Tree::empty(&store_a)
            .edit(vec![(v(1), Some(v(10))), (v(2), Some(v(20)))])
            .unwrap()
            .edit(vec![(v(3), Some(v(30)))])
            .unwrap();
        let b = Tree::empty(&store_b)
            .edit(vec![(v(3), Some(v(30))), (v(1), Some(v(10)))])
            .unwrap()
            .edit(vec![(v(2), Some(v(20)))])
            .unwrap();
        assert_eq!(a.root_hash(), b.root_hash());
    }

    #[test]
    fn first_and_last_track_extremes_across_a_multi_level_tree() {
        let store = MemoryStore::new();
        let edits: Vec<_> = (0..4000).map(|n| (v(n), Some(Value::String(format!("v{n}"))))).collect();
        let tree = Tree::empty(&store).edit(edits).unwrap();
        assert_eq!(tree.first().unwrap().unwrap().0, v(0));
        assert_eq!(tree.last().unwrap().unwrap().0, v(3999));
    }

    #[test]
    fn deleting_every_key_returns_to_empty() {
        let store = MemoryStore::new();
        let tree = Tree::empty(&store).edit(vec![(v(1), Some(v(1))), (v(2), Some(v(2)))]).unwrap();
        let tree = tree.edit(vec![(v(1), None), (v(2), None)]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }
}
