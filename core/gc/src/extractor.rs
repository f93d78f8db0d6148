//! A store holds four different chunk shapes side by side — commits, root values, tables,
//! and prolly nodes — distinguished by the leading chunk-kind tag byte every encoder writes
//! (`dolt_codec::chunk_kind`, spec.md §3/§6's `[kind:1][payload:*]`). [`GcChildExtractor`]
//! dispatches on that tag directly rather than trial-decoding each shape in turn, so a
//! chunk can never be misclassified as the wrong kind.

use dolt_codec::{CHUNK_KIND_COMMIT, CHUNK_KIND_PROLLY_INTERNAL, CHUNK_KIND_PROLLY_LEAF, CHUNK_KIND_ROOT_VALUE, CHUNK_KIND_TABLE};
use dolt_hash::Hash;
use dolt_valuegraph::{ChildExtractor, ValueGraphError};

pub struct GcChildExtractor;

impl ChildExtractor for GcChildExtractor {
    fn children(&self, hash: Hash, bytes: &[u8]) -> Result<Vec<Hash>, ValueGraphError> {
        match bytes.first().copied() {
            Some(CHUNK_KIND_PROLLY_LEAF) | Some(CHUNK_KIND_PROLLY_INTERNAL) => {
                dolt_valuegraph::ProllyChildExtractor.children(hash, bytes)
            }
            Some(CHUNK_KIND_COMMIT) => dolt_versioning::CommitChildExtractor.children(hash, bytes),
            Some(CHUNK_KIND_ROOT_VALUE) => dolt_versioning::RootValueChildExtractor.children(hash, bytes),
            Some(CHUNK_KIND_TABLE) => dolt_schema::TableChildExtractor.children(hash, bytes),
            // A schema chunk (no further chunk-hash children of its own) or any other opaque
            // leaf blob (an out-of-line `Value::Ref` target, say) carries none of the known
            // chunk-kind tags. Treat it as a reachable leaf rather than failing the whole
            // walk — the chunk itself is still marked reachable by the caller that reached
            // it here.
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_codec::Number;
    use dolt_prolly::node::{encode_node, ChildRef, Node};
    use dolt_schema::{encode_table, Table};
    use dolt_versioning::{encode_commit, Commit, CommitMeta};

    #[test]
    fn distinguishes_a_commit_chunk() {
        let commit = Commit {
            parents: vec![Hash::of_bytes(b"parent")],
            value: Hash::of_bytes(b"root"),
            meta: CommitMeta {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                timestamp: 0,
                description: "msg".to_string(),
                extra: vec![],
            },
        };
        let bytes = encode_commit(&commit);
        let children = GcChildExtractor.children(Hash::of_bytes(&bytes), &bytes).unwrap();
        assert!(children.contains(&commit.value));
        assert!(children.contains(&commit.parents[0]));
    }

    #[test]
    fn distinguishes_a_table_chunk() {
        let table = Table {
            schema: Hash::of_bytes(b"schema"),
            rows: Some(ChildRef { hash: Hash::of_bytes(b"rows"), height: 0, count: 1 }),
            indexes: vec![],
            autoinc: Number::from_i64(0),
            constraint_violations: None,
            conflicts: None,
        };
        let bytes = encode_table(&table);
        let children = GcChildExtractor.children(Hash::of_bytes(&bytes), &bytes).unwrap();
        assert!(children.contains(&table.schema));
        assert!(children.contains(&Hash::of_bytes(b"rows")));
    }

    #[test]
    fn falls_through_to_a_prolly_leaf() {
        let node = Node::Leaf(vec![]);
        let bytes = encode_node(&node);
        let children = GcChildExtractor.children(Hash::of_bytes(&bytes), &bytes).unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn an_opaque_blob_that_matches_no_known_shape_is_a_childless_leaf() {
        let bytes = b"not any known chunk shape".to_vec();
        let children = GcChildExtractor.children(Hash::of_bytes(&bytes), &bytes).unwrap();
        assert!(children.is_empty());
    }
}
