//! Prolly tree node encoding (spec.md §4.3): leaves hold `(key, value)` items in key order;
//! internal nodes hold `(last_key, child_ref)` pairs, also in key order. Both are written as
//! one opaque chunk each through the same `ChunkStore` every other chunk goes through.

use dolt_codec::{decode_value, encode_value, CHUNK_KIND_PROLLY_INTERNAL, CHUNK_KIND_PROLLY_LEAF, Value};
use dolt_hash::{Hash, HASH_LEN};

use crate::ProllyError;

const TAG_LEAF: u8 = CHUNK_KIND_PROLLY_LEAF;
const TAG_INTERNAL: u8 = CHUNK_KIND_PROLLY_INTERNAL;

/// A pointer from an internal node down to a child subtree, carrying enough metadata that
/// `Len()` and `Height()` never require descending (spec.md §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildRef {
    pub hash: Hash,
    /// 0 if the child is a leaf; otherwise one more than the child's own height.
    pub height: u64,
    /// Total item count across the child's subtree.
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf(Vec<(Value, Value)>),
    Internal {
        height: u64,
        /// Parallel to `children`: the greatest key in each child's subtree.
        last_keys: Vec<Value>,
        children: Vec<ChildRef>,
    },
}

impl Node {
    pub fn height(&self) -> u64 {
        match self {
            Node::Leaf(_) => 0,
            Node::Internal { height, .. } => *height,
        }
    }

    pub fn item_count(&self) -> u64 {
        match self {
            Node::Leaf(entries) => entries.len() as u64,
            Node::Internal { children, .. } => children.iter().map(|c| c.count).sum(),
        }
    }

    pub fn is_empty_leaf(&self) -> bool {
        matches!(self, Node::Leaf(entries) if entries.is_empty())
    }
}

pub fn encode_node(node: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    match node {
        Node::Leaf(entries) => {
            out.push(TAG_LEAF);
            write_varint(&mut out, entries.len() as u64);
            for (k, v) in entries {
                let ek = encode_value(k);
                write_varint(&mut out, ek.len() as u64);
                out.extend_from_slice(&ek);
                let ev = encode_value(v);
                write_varint(&mut out, ev.len() as u64);
                out.extend_from_slice(&ev);
            }
        }
        Node::Internal { height, last_keys, children } => {
            out.push(TAG_INTERNAL);
            write_varint(&mut out, *height);
            write_varint(&mut out, children.len() as u64);
            for (key, child) in last_keys.iter().zip(children) {
                let ek = encode_value(key);
                write_varint(&mut out, ek.len() as u64);
                out.extend_from_slice(&ek);
                out.extend_from_slice(child.hash.as_bytes());
                write_varint(&mut out, child.height);
                write_varint(&mut out, child.count);
            }
        }
    }
    out
}

pub fn decode_node(bytes: &[u8]) -> Result<Node, ProllyError> {
    let tag = *bytes.first().ok_or(ProllyError::Corrupt("empty node chunk".to_string()))?;
    let mut pos = 1;
    match tag {
        TAG_LEAF => {
            let (count, n) = read_varint(&bytes[pos..])?;
            pos += n;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (len, n) = read_varint(&bytes[pos..])?;
                pos += n;
                let slice = bytes.get(pos..pos + len as usize).ok_or(ProllyError::Corrupt("truncated key".to_string()))?;
                let (key, consumed) =
                    decode_value(slice).map_err(|e| ProllyError::codec("leaf key", e))?;
                debug_assert_eq!(consumed, slice.len());
                pos += len as usize;

                let (len, n) = read_varint(&bytes[pos..])?;
                pos += n;
                let slice = bytes.get(pos..pos + len as usize).ok_or(ProllyError::Corrupt("truncated value".to_string()))?;
                let (value, consumed) =
                    decode_value(slice).map_err(|e| ProllyError::codec("leaf value", e))?;
                debug_assert_eq!(consumed, slice.len());
                pos += len as usize;

                entries.push((key, value));
            }
            Ok(Node::Leaf(entries))
        }
        TAG_INTERNAL => {
            let (height, n) = read_varint(&bytes[pos..])?;
            pos += n;
            let (count, n) = read_varint(&bytes[pos..])?;
            pos += n;
            let mut last_keys = Vec::with_capacity(count as usize);
            let mut children = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (len, n) = read_varint(&bytes[pos..])?;
                pos += n;
                let slice = bytes.get(pos..pos + len as usize).ok_or(ProllyError::Corrupt("truncated last_key".to_string()))?;
                let (key, consumed) =
                    decode_value(slice).map_err(|e| ProllyError::codec("internal last_key", e))?;
                debug_assert_eq!(consumed, slice.len());
                pos += len as usize;

                let hash_bytes =
                    bytes.get(pos..pos + HASH_LEN).ok_or(ProllyError::Corrupt("truncated child hash".to_string()))?;
                let mut arr = [0u8; HASH_LEN];
                arr.copy_from_slice(hash_bytes);
                pos += HASH_LEN;

                let (child_height, n) = read_varint(&bytes[pos..])?;
                pos += n;
                let (child_count, n) = read_varint(&bytes[pos..])?;
                pos += n;

                last_keys.push(key);
                children.push(ChildRef { hash: Hash::from_bytes(arr), height: child_height, count: child_count });
            }
            Ok(Node::Internal { height, last_keys, children })
        }
        other => Err(ProllyError::Corrupt(format!("unknown node tag {other}"))),
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(buf: &[u8]) -> Result<(u64, usize), ProllyError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 64 {
            return Err(ProllyError::Corrupt("varint too long".to_string()));
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(ProllyError::Corrupt("truncated varint".to_string()))
}
