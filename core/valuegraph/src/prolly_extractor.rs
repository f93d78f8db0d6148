//! [`ChildExtractor`] for prolly tree chunks (spec.md §4.3): internal nodes point at their
//! children directly; leaves may hold row values that themselves contain [`Value::Ref`]s
//! (out-of-line blobs, nested collections) that also need to stay reachable.

use dolt_codec::Value;
use dolt_hash::Hash;
use dolt_prolly::node::{decode_node, Node};

use crate::walker::ChildExtractor;
use crate::ValueGraphError;

pub struct ProllyChildExtractor;

impl ChildExtractor for ProllyChildExtractor {
    fn children(&self, _hash: Hash, bytes: &[u8]) -> Result<Vec<Hash>, ValueGraphError> {
        let node = decode_node(bytes).map_err(|e| ValueGraphError::Corrupt(e.to_string()))?;
        let mut out = Vec::new();
        match node {
            Node::Internal { children, .. } => out.extend(children.into_iter().map(|c| c.hash)),
            Node::Leaf(entries) => {
                for (key, value) in &entries {
                    collect_refs(key, &mut out);
                    collect_refs(value, &mut out);
                }
            }
        }
        Ok(out)
    }
}

fn collect_refs(value: &Value, out: &mut Vec<Hash>) {
    match value {
        Value::Ref(r) => out.push(r.target_hash),
        Value::List(items) | Value::Set(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        Value::Map(entries) => {
            for (k, v) in entries {
                collect_refs(k, out);
                collect_refs(v, out);
            }
        }
        Value::Struct(s) => {
            for v in &s.values {
                collect_refs(v, out);
            }
        }
        Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Blob(_) | Value::Type(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_codec::{Number, RefValue, TargetType};
    use dolt_prolly::node::{encode_node, ChildRef};

    #[test]
    fn internal_node_yields_its_children() {
        let node = Node::Internal {
            height: 1,
            last_keys: vec![Value::Number(Number::from_i64(1))],
            children: vec![ChildRef { hash: Hash::of_bytes(b"child"), height: 0, count: 1 }],
        };
        let bytes = encode_node(&node);
        let extractor = ProllyChildExtractor;
        let children = extractor.children(Hash::of_bytes(&bytes), &bytes).unwrap();
        assert_eq!(children, vec![Hash::of_bytes(b"child")]);
    }

    #[test]
    fn leaf_surfaces_refs_nested_in_row_values() {
        let blob_hash = Hash::of_bytes(b"blob chunk");
        let row_value = Value::Struct(dolt_codec::StructValue {
            type_: dolt_codec::StructType {
                name: "Row".to_string(),
                fields: vec![dolt_codec::StructField {
                    name: "payload".to_string(),
                    field_type: dolt_codec::TypeDesc::Ref(Box::new(dolt_codec::TypeDesc::Blob)),
                    optional: false,
                }],
            },
            values: vec![Value::Ref(RefValue {
                target_type: TargetType::Primitive(dolt_codec::PrimitiveKind::Blob),
                target_hash: blob_hash,
                height: 0,
                item_count: 1,
            })],
        });
        let node = Node::Leaf(vec![(Value::Number(Number::from_i64(1)), row_value)]);
        let bytes = encode_node(&node);
        let extractor = ProllyChildExtractor;
        let children = extractor.children(Hash::of_bytes(&bytes), &bytes).unwrap();
        assert_eq!(children, vec![blob_hash]);
    }
}
