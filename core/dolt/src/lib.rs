//! `dolt-core`: the facade crate tying the lower-level `dolt-*` crates together into the
//! Query surface (spec.md §6 / SPEC_FULL.md §6) — `OpenRoot`, `GetTable`, `PutTable`,
//! `CommitWorkingSet`, `Diff`, `Merge`, `ResolveRef`, `UpdateRef` — plus the `dolt-cli`
//! binary target that drives it from the command line.

mod error;
mod repo;

pub use error::DoltError;
pub use repo::Repo;

pub use dolt_chunks::{ChunkStore, ChunkStoreError, MemoryStore, NbsConfig, NbsStore};
pub use dolt_codec::{Number, Value};
pub use dolt_diff::{table_diff, RowMergeResult, SchemaConflict, TableDiff};
pub use dolt_gc::{collect_garbage, ExactReachableSet, ReachableSet};
pub use dolt_hash::Hash;
pub use dolt_prolly::{ChildRef, Tree};
pub use dolt_schema::{
    decode_row, decode_schema, encode_schema, row_key, row_value, ColumnDescriptor, ColumnType, Schema, Table,
};
pub use dolt_versioning::{
    decode_commit, decode_root_value, encode_commit, encode_root_value, merge_base, resolve_ancestor, AncestorSpec, Commit,
    CommitIterator, CommitMeta, JsonRefStore, RefKind, RefName, RefStore, RootValue,
};
