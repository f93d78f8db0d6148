//! Bottom-up tree construction from a sorted, deduplicated item sequence (spec.md §4.3).
//!
//! The same content-defined-chunking rule is applied level by level: leaves are cut from
//! the raw `(key, value)` stream, then each level above is cut from the serialized
//! `(last_key, ChildRef)` stream of the level below, until one node remains. Every
//! intermediate grouping — whatever size the rolling hash produces — is written as its own
//! chunk immediately, so the final root is itself already a persisted chunk.

use dolt_chunks::ChunkStore;
use dolt_codec::{encode_value, Value};

use crate::chunker::{RollingHasher, MAX_CHUNK_ITEMS};
use crate::node::{encode_node, ChildRef, Node};
use crate::ProllyError;

/// Builds a tree over `items` (must already be sorted by key with unique keys) and returns
/// a reference to its root, or `None` for an empty tree (which writes no chunk at all).
pub fn build_tree(
    store: &dyn ChunkStore,
    items: Vec<(Value, Value)>,
) -> Result<Option<ChildRef>, ProllyError> {
    if items.is_empty() {
        return Ok(None);
    }

    let mut level = chunk_leaves(store, items)?;
    let mut height = 1;
    while level.len() > 1 {
        level = chunk_internal(store, level, height)?;
        height += 1;
    }
    Ok(level.into_iter().next().map(|(_, child)| child))
}

fn chunk_leaves(
    store: &dyn ChunkStore,
    items: Vec<(Value, Value)>,
) -> Result<Vec<(Value, ChildRef)>, ProllyError> {
    chunk_stream(items, |(k, v)| {
        let mut bytes = encode_value(k);
        bytes.extend(encode_value(v));
        bytes
    }, |entries| {
        let last_key = entries.last().expect("non-empty chunk group").0.clone();
        let node = Node::Leaf(entries);
        let count = node.item_count();
        let hash = store.put(encode_node(&node))?;
        Ok((last_key, ChildRef { hash, height: 0, count }))
    })
}

fn chunk_internal(
    store: &dyn ChunkStore,
    level: Vec<(Value, ChildRef)>,
    height: u64,
) -> Result<Vec<(Value, ChildRef)>, ProllyError> {
    chunk_stream(level, |(key, child)| {
        let mut bytes = encode_value(key);
        bytes.extend_from_slice(child.hash.as_bytes());
        bytes.push(child.height as u8);
        bytes
    }, move |entries| {
        let last_key = entries.last().expect("non-empty chunk group").0.clone();
        let (last_keys, children): (Vec<Value>, Vec<ChildRef>) = entries.into_iter().unzip();
        let node = Node::Internal { height, last_keys, children };
        let count = node.item_count();
        let hash = store.put(encode_node(&node))?;
        Ok((last_key, ChildRef { hash, height, count }))
    })
}

/// Groups `items` into chunks by the rolling-hash boundary rule, feeding each item's
/// `feed` bytes into the hasher and handing each finished group to `on_chunk`.
fn chunk_stream<T>(
    items: Vec<T>,
    mut feed: impl FnMut(&T) -> Vec<u8>,
    mut on_chunk: impl FnMut(Vec<T>) -> Result<(Value, ChildRef), ProllyError>,
) -> Result<Vec<(Value, ChildRef)>, ProllyError> {
    let total = items.len();
    let mut out = Vec::new();
    let mut hasher = RollingHasher::new();
    let mut buf = Vec::new();

    for (i, item) in items.into_iter().enumerate() {
        for byte in feed(&item) {
            hasher.push(byte);
        }
        buf.push(item);
        let is_last = i + 1 == total;
        if is_last || buf.len() >= MAX_CHUNK_ITEMS || hasher.is_boundary() {
            let group = std::mem::take(&mut buf);
            out.push(on_chunk(group)?);
            hasher = RollingHasher::new();
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_chunks::MemoryStore;
    use dolt_codec::Number;

    fn kv(n: i64) -> (Value, Value) {
        (Value::Number(Number::from_i64(n)), Value::String(format!("value-{n}")))
    }

    #[test]
    fn empty_items_yield_no_root() {
        let store = MemoryStore::new();
        assert!(build_tree(&store, vec![]).unwrap().is_none());
    }

    #[test]
    fn single_item_builds_one_leaf() {
        let store = MemoryStore::new();
        let root = build_tree(&store, vec![kv(1)]).unwrap().unwrap();
        assert_eq!(root.height, 0);
        assert_eq!(root.count, 1);
        let node = crate::node::decode_node(&store.get(&root.hash).unwrap()).unwrap();
        assert!(matches!(node, Node::Leaf(entries) if entries.len() == 1));
    }

    #[test]
    fn many_items_build_a_multi_level_tree() {
        let store = MemoryStore::new();
        let items: Vec<_> = (0..5000).map(kv).collect();
        let root = build_tree(&store, items).unwrap().unwrap();
        assert_eq!(root.count, 5000);
        assert!(root.height > 0, "5000 items should not fit in a single leaf chunk");
    }

    #[test]
    fn identical_content_yields_identical_root_hash() {
        let store_a = MemoryStore::new();
        let store_b = MemoryStore::new();
        let items: Vec<_> = (0..2000).map(kv).collect();
        let root_a = build_tree(&store_a, items.clone()).unwrap().unwrap();
        let root_b = build_tree(&store_b, items).unwrap().unwrap();
        assert_eq!(root_a.hash, root_b.hash);
        assert_eq!(root_a.height, root_b.height);
    }
}
