//! Row diff (spec.md §4.6: "wraps prolly `Diff` to produce per-table `(added, removed,
//! modified)` streams where `modified` carries both the old and new row").

use dolt_chunks::ChunkStore;
use dolt_codec::Value;
use dolt_prolly::{diff as prolly_diff, ChildRef, DiffEntry};

use crate::MergeError;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TableDiff {
    pub added: Vec<(Value, Value)>,
    pub removed: Vec<(Value, Value)>,
    pub modified: Vec<(Value, Value, Value)>,
}

pub fn table_diff(store: &dyn ChunkStore, before: Option<&ChildRef>, after: Option<&ChildRef>) -> Result<TableDiff, MergeError> {
    let entries = prolly_diff(store, before, after)?;
    let mut out = TableDiff::default();
    for entry in entries {
        match entry {
            DiffEntry::Added { key, new } => out.added.push((key, new)),
            DiffEntry::Removed { key, old } => out.removed.push((key, old)),
            DiffEntry::Modified { key, old, new } => out.modified.push((key, old, new)),
        }
    }
    Ok(out)
}
