//! A stack-based pull iterator over a tree's items in key order (spec.md §4.3,
//! §9 "Coroutine-style streaming iterators... implemented as an explicit cursor stack rather
//! than recursion, so a diff over two multi-gigabyte tables doesn't need two call stacks").
//!
//! Each frame on the stack is either a fully materialized leaf (items, plus a read
//! position) or an internal node (children, plus the index of the child currently being
//! descended into). The invariant maintained between calls to [`Cursor::next`] is: if the
//! stack is non-empty, its top frame is always a leaf.

use dolt_chunks::ChunkStore;
use dolt_codec::{compare_values, Value};
use dolt_hash::Hash;
use smallvec::SmallVec;

use crate::node::{decode_node, ChildRef, Node};
use crate::ProllyError;

enum Frame {
    Leaf { entries: Vec<(Value, Value)>, index: usize },
    Internal { children: Vec<ChildRef>, index: usize },
}

/// One frame per tree level. Fan-out keeps even multi-gigabyte trees only a handful of
/// levels deep, so the stack almost never spills past its inline capacity onto the heap.
type FrameStack = SmallVec<[Frame; 8]>;

pub struct Cursor<'s> {
    store: &'s dyn ChunkStore,
    stack: FrameStack,
}

impl<'s> Cursor<'s> {
    /// Positions a cursor at the first item whose key is `>= key`, or at the first item in
    /// the tree if `key` is `None`. An empty tree (`root = None`) yields an empty cursor.
    pub fn seek(
        store: &'s dyn ChunkStore,
        root: Option<&ChildRef>,
        key: Option<&Value>,
    ) -> Result<Cursor<'s>, ProllyError> {
        let mut cursor = Cursor { store, stack: FrameStack::new() };
        if let Some(root) = root {
            cursor.descend(root.hash, key)?;
        }
        Ok(cursor)
    }

    fn descend(&mut self, hash: Hash, key: Option<&Value>) -> Result<(), ProllyError> {
        let node = decode_node(&self.store.get(&hash)?)?;
        match node {
            Node::Leaf(entries) => {
                let index = match key {
                    None => 0,
                    Some(k) => entries.partition_point(|(ek, _)| compare_values(ek, k) == std::cmp::Ordering::Less),
                };
                self.stack.push(Frame::Leaf { entries, index });
            }
            Node::Internal { last_keys, children, .. } => {
                let index = match key {
                    None => 0,
                    Some(k) => last_keys
                        .partition_point(|lk| compare_values(lk, k) == std::cmp::Ordering::Less)
                        .min(children.len() - 1),
                };
                let child_hash = children[index].hash;
                self.stack.push(Frame::Internal { children, index });
                self.descend(child_hash, key)?;
            }
        }
        Ok(())
    }

    /// Advances the nearest enclosing internal frame to its next child and descends
    /// leftward into it; pops exhausted internal frames on the way up.
    fn advance_parent(&mut self) -> Result<(), ProllyError> {
        loop {
            match self.stack.last_mut() {
                None => return Ok(()),
                Some(Frame::Internal { children, index }) => {
                    *index += 1;
                    if *index < children.len() {
                        let hash = children[*index].hash;
                        self.descend(hash, None)?;
                        return Ok(());
                    }
                    self.stack.pop();
                }
                Some(Frame::Leaf { .. }) => return Ok(()),
            }
        }
    }

    pub fn next(&mut self) -> Result<Option<(Value, Value)>, ProllyError> {
        loop {
            match self.stack.last_mut() {
                None => return Ok(None),
                Some(Frame::Leaf { entries, index }) => {
                    if *index < entries.len() {
                        let item = entries[*index].clone();
                        *index += 1;
                        return Ok(Some(item));
                    }
                    self.stack.pop();
                    self.advance_parent()?;
                }
                Some(Frame::Internal { .. }) => {
                    // `descend` always leaves a leaf on top; this arm only exists so the
                    // match is exhaustive after `advance_parent` restructures the stack.
                    continue;
                }
            }
        }
    }
}

/// Materializes every item of a tree, in key order. Used by [`crate::build::build_tree`]
/// callers that need the full sequence (edit, diff's fallback path).
pub fn collect_all(
    store: &dyn ChunkStore,
    root: Option<&ChildRef>,
) -> Result<Vec<(Value, Value)>, ProllyError> {
    let mut cursor = Cursor::seek(store, root, None)?;
    let mut out = Vec::new();
    while let Some(item) = cursor.next()? {
        out.push(item);
    }
    Ok(out)
}
