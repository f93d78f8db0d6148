//! Mark phase (spec.md §4.7): "enumerate every commit hash referenced by any branch/tag/
//! working-set ref; walk the value graph... The set is the *reachable closure*."

use dolt_chunks::ChunkStore;
use dolt_hash::Hash;
use dolt_valuegraph::Walker;

use crate::extractor::GcChildExtractor;
use crate::reachable::ExactReachableSet;
use crate::GcError;

/// Walks the value graph from every ref target plus any in-flight working-set roots,
/// returning the exact set of reachable chunk hashes.
///
/// Callers collect `roots` themselves (spec.md leaves ref enumeration to the caller that
/// already holds the `RefStore`): typically every `RefStore::list` result across branches,
/// tags, and working sets, resolved to the `Hash` each currently points at, plus (per
/// spec.md §4.7) each working set's staged/working root pair so in-progress edits that
/// haven't been committed yet still survive a concurrent GC.
pub fn mark(store: &dyn ChunkStore, roots: impl IntoIterator<Item = Hash>) -> Result<ExactReachableSet, GcError> {
    let extractor = GcChildExtractor;
    let walker = Walker::new(store, &extractor);
    let closure = walker.closure(roots)?;
    tracing::debug!(reachable = closure.len(), "GC mark phase complete");
    Ok(ExactReachableSet::new(closure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_chunks::MemoryStore;
    use dolt_codec::{Number, Value};
    use dolt_prolly::build_tree;
    use dolt_schema::{encode_table, Table};
    use dolt_versioning::{encode_commit, Commit, CommitMeta};

    fn num(n: i64) -> Value {
        Value::Number(Number::from_i64(n))
    }

    fn meta() -> CommitMeta {
        CommitMeta {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            timestamp: 0,
            description: "msg".to_string(),
            extra: vec![],
        }
    }

    #[test]
    fn mark_follows_commit_to_table_to_rows() {
        let store = MemoryStore::new();
        let rows = build_tree(&store, vec![(num(1), num(2))]).unwrap();
        let table = Table {
            schema: store.put(b"schema-bytes".to_vec()).unwrap(),
            rows: rows.clone(),
            indexes: vec![],
            autoinc: Number::from_i64(0),
            constraint_violations: None,
            conflicts: None,
        };
        let table_hash = store.put(encode_table(&table)).unwrap();
        let commit = Commit { parents: vec![], value: table_hash, meta: meta() };
        let commit_hash = store.put(encode_commit(&commit)).unwrap();

        let reachable = mark(&store, [commit_hash]).unwrap();
        assert!(reachable.contains(&commit_hash));
        assert!(reachable.contains(&table_hash));
        assert!(reachable.contains(&table.schema));
        assert!(reachable.contains(&rows.unwrap().hash));
    }

    #[test]
    fn unreachable_chunks_are_excluded() {
        let store = MemoryStore::new();
        let orphan = store.put(b"nobody points at me".to_vec()).unwrap();
        let commit = Commit {
            parents: vec![],
            value: store.put(encode_table(&Table {
                schema: Hash::EMPTY,
                rows: None,
                indexes: vec![],
                autoinc: Number::from_i64(0),
                constraint_violations: None,
                conflicts: None,
            })).unwrap(),
            meta: meta(),
        };
        let commit_hash = store.put(encode_commit(&commit)).unwrap();

        let reachable = mark(&store, [commit_hash]).unwrap();
        assert!(!reachable.contains(&orphan));
    }
}
