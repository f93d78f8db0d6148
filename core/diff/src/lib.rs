//! Diff and three-way merge (spec.md §4.6): row diff wraps `dolt_prolly::diff`; schema
//! merge and row merge are built on the shared [`classify::classify`] combinator;
//! constraint checking runs after row merge and produces structured violation records
//! rather than errors.

pub mod classify;
pub mod constraints;
pub mod merge;
pub mod row_diff;
pub mod schema_merge;

pub use constraints::{check_foreign_keys, check_unique, ConstraintViolation, ViolationKind};
pub use merge::{merge_rows, RowConflict, RowMergeResult};
pub use row_diff::{table_diff, TableDiff};
pub use schema_merge::{merge_schema, SchemaConflict};

/// spec.md §7: conflicts and constraint violations are structured `MergeResult` output,
/// not errors — only a genuinely irrecoverable condition (an incompatible schema, or a
/// lower-layer store failure) is a real `MergeError`.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("schema merge is incompatible: {0:?}")]
    SchemaIncompatible(Vec<SchemaConflict>),
    #[error(transparent)]
    Prolly(#[from] dolt_prolly::ProllyError),
    #[error(transparent)]
    Store(#[from] dolt_chunks::ChunkStoreError),
}
