//! Three-way row merge for one table (spec.md §4.6).
//!
//! "For each PK present in any of O, T, B: classify... Write the non-conflicting outcome;
//! for the conflicting outcomes, record a conflict tuple... and leave the row value equal
//! to ours. Fast-forward rule: if B == O, the result is T and no row-level merge is
//! performed."

use dolt_chunks::ChunkStore;
use dolt_codec::{compare_values, Value};
use dolt_prolly::cursor::collect_all;
use dolt_prolly::{build_tree, ChildRef};

use crate::classify::{classify, Outcome};
use crate::MergeError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowConflict {
    pub pk: Value,
    pub base: Option<Value>,
    pub ours: Option<Value>,
    pub theirs: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RowMergeResult {
    pub rows: Option<ChildRef>,
    pub conflicts: Vec<RowConflict>,
}

fn same_root(a: Option<&ChildRef>, b: Option<&ChildRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.hash == y.hash,
        _ => false,
    }
}

pub fn merge_rows(
    store: &dyn ChunkStore,
    base: Option<&ChildRef>,
    ours: Option<&ChildRef>,
    theirs: Option<&ChildRef>,
) -> Result<RowMergeResult, MergeError> {
    if same_root(base, ours) {
        return Ok(RowMergeResult { rows: theirs.cloned(), conflicts: Vec::new() });
    }
    if same_root(ours, theirs) {
        return Ok(RowMergeResult { rows: ours.cloned(), conflicts: Vec::new() });
    }

    let base_items = collect_all(store, base)?;
    let ours_items = collect_all(store, ours)?;
    let theirs_items = collect_all(store, theirs)?;

    let mut bi = base_items.into_iter().peekable();
    let mut oi = ours_items.into_iter().peekable();
    let mut ti = theirs_items.into_iter().peekable();

    let mut merged_entries = Vec::new();
    let mut conflicts = Vec::new();

    loop {
        let bk = bi.peek().map(|(k, _)| k.clone());
        let ok = oi.peek().map(|(k, _)| k.clone());
        let tk = ti.peek().map(|(k, _)| k.clone());

        let min = [&bk, &ok, &tk].into_iter().flatten().min_by(|a, b| compare_values(a, b)).cloned();
        let Some(min) = min else { break };

        let b_val = if bk.as_ref() == Some(&min) { Some(bi.next().unwrap().1) } else { None };
        let o_val = if ok.as_ref() == Some(&min) { Some(oi.next().unwrap().1) } else { None };
        let t_val = if tk.as_ref() == Some(&min) { Some(ti.next().unwrap().1) } else { None };

        match classify(b_val.as_ref(), o_val.as_ref(), t_val.as_ref()) {
            Outcome::Resolved(Some(v)) => merged_entries.push((min, v)),
            Outcome::Resolved(None) => {}
            Outcome::Conflict => {
                if let Some(v) = o_val.clone() {
                    merged_entries.push((min.clone(), v));
                }
                conflicts.push(RowConflict { pk: min, base: b_val, ours: o_val, theirs: t_val });
            }
        }
    }

    let rows = build_tree(store, merged_entries)?;
    Ok(RowMergeResult { rows, conflicts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_chunks::MemoryStore;
    use dolt_codec::Number;
    use dolt_prolly::build_tree;

    fn kv(n: i64, s: &str) -> (Value, Value) {
        (Value::Number(Number::from_i64(n)), Value::String(s.to_string()))
    }

    #[test]
    fn fast_forward_when_base_equals_ours() {
        let store = MemoryStore::new();
        let base = build_tree(&store, vec![kv(1, "a")]).unwrap();
        let theirs = build_tree(&store, vec![kv(1, "a"), kv(2, "b")]).unwrap();

        let result = merge_rows(&store, base.as_ref(), base.as_ref(), theirs.as_ref()).unwrap();
        assert_eq!(result.rows.as_ref().unwrap().hash, theirs.as_ref().unwrap().hash);
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn non_conflicting_changes_on_both_sides_merge_cleanly() {
        let store = MemoryStore::new();
        let base = build_tree(&store, vec![kv(1, "a"), kv(2, "b")]).unwrap();
        let ours = build_tree(&store, vec![kv(1, "a"), kv(2, "b"), kv(3, "new-by-ours")]).unwrap();
        let theirs = build_tree(&store, vec![kv(1, "a"), kv(2, "changed-by-theirs")]).unwrap();

        let result = merge_rows(&store, base.as_ref(), ours.as_ref(), theirs.as_ref()).unwrap();
        assert!(result.conflicts.is_empty());
        let merged = collect_all(&store, result.rows.as_ref()).unwrap();
        assert_eq!(merged.len(), 3);
        assert!(merged.contains(&kv(2, "changed-by-theirs")));
        assert!(merged.contains(&kv(3, "new-by-ours")));
    }

    #[test]
    fn conflicting_modifications_are_recorded_and_ours_wins_in_place() {
        let store = MemoryStore::new();
        let base = build_tree(&store, vec![kv(1, "a")]).unwrap();
        let ours = build_tree(&store, vec![kv(1, "ours-value")]).unwrap();
        let theirs = build_tree(&store, vec![kv(1, "theirs-value")]).unwrap();

        let result = merge_rows(&store, base.as_ref(), ours.as_ref(), theirs.as_ref()).unwrap();
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].ours, Some(Value::String("ours-value".to_string())));
        assert_eq!(result.conflicts[0].theirs, Some(Value::String("theirs-value".to_string())));

        let merged = collect_all(&store, result.rows.as_ref()).unwrap();
        assert_eq!(merged, vec![kv(1, "ours-value")]);
    }

    #[test]
    fn modified_here_deleted_there_is_a_conflict_that_keeps_ours() {
        let store = MemoryStore::new();
        let base = build_tree(&store, vec![kv(1, "a")]).unwrap();
        let ours = build_tree(&store, vec![kv(1, "modified")]).unwrap();
        let theirs = build_tree(&store, vec![]).unwrap();

        let result = merge_rows(&store, base.as_ref(), ours.as_ref(), theirs.as_ref()).unwrap();
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].theirs, None);
        let merged = collect_all(&store, result.rows.as_ref()).unwrap();
        assert_eq!(merged, vec![kv(1, "modified")]);
    }
}
