//! The Query surface (spec.md §6 / SPEC_FULL.md §6): `OpenRoot`, `GetTable`, `PutTable`,
//! `CommitWorkingSet`, `Diff`, `Merge`, `ResolveRef`, `UpdateRef`, implemented against
//! whatever `ChunkStore`/`RefStore` pair the caller hands in.
//!
//! `Merge` is realized as two calls rather than one — `merge_schema` then `merge_rows` —
//! since a row merge is only meaningful once the two sides' schemas have reconciled into
//! one PK layout; see DESIGN.md for why that's a facade-level composition rather than a
//! single `dolt_diff` entry point.

use std::sync::Arc;

use dolt_chunks::ChunkStore;
use dolt_diff::{merge_rows, merge_schema, table_diff, RowMergeResult, SchemaConflict, TableDiff};
use dolt_hash::Hash;
use dolt_schema::{decode_table, encode_table, Schema, Table};
use dolt_versioning::{decode_commit, decode_root_value, encode_commit, encode_root_value, Commit, CommitMeta, RefName, RefStore, RootValue};

use crate::DoltError;

pub struct Repo {
    store: Arc<dyn ChunkStore>,
    refs: Arc<dyn RefStore>,
}

impl Repo {
    pub fn new(store: Arc<dyn ChunkStore>, refs: Arc<dyn RefStore>) -> Repo {
        Repo { store, refs }
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    pub fn refs(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    /// `OpenRoot`: the empty hash stands for "no root value committed yet" rather than a
    /// store lookup (spec.md §4.2's sentinel convention).
    pub fn open_root(&self, hash: Hash) -> Result<RootValue, DoltError> {
        if hash.is_empty() {
            return Ok(RootValue::default());
        }
        Ok(decode_root_value(&self.store.get(&hash)?)?)
    }

    /// `GetTable`.
    pub fn get_table(&self, root: &RootValue, name: &str) -> Result<Option<Table>, DoltError> {
        let Some(hash) = root.table(name) else { return Ok(None) };
        Ok(Some(decode_table(&self.store.get(&hash)?)?))
    }

    /// `PutTable`: writes the table chunk and returns the root value with that table's
    /// entry replaced, alongside the new table's hash.
    pub fn put_table(&self, root: &RootValue, name: &str, table: &Table) -> Result<(RootValue, Hash), DoltError> {
        let hash = self.store.put(encode_table(table))?;
        Ok((root.with_table(name, hash), hash))
    }

    /// `CommitWorkingSet`: appends one commit onto `branch`'s current tip (if any) and
    /// CAS-advances the ref. Returns the new commit hash.
    pub fn commit_working_set(&self, branch: &RefName, root_hash: Hash, meta: CommitMeta) -> Result<Hash, DoltError> {
        let parent = self.refs.get(branch)?;
        let commit = Commit { parents: parent.into_iter().collect(), value: root_hash, meta };
        let commit_hash = self.store.put(encode_commit(&commit))?;
        if !self.refs.cas(branch, parent, commit_hash)? {
            return Err(DoltError::RefCasFailed(branch.to_string()));
        }
        Ok(commit_hash)
    }

    /// `Diff`, at the single-table row level (spec.md §4.6).
    pub fn diff_table(&self, before: Option<&Table>, after: Option<&Table>) -> Result<TableDiff, DoltError> {
        let before_rows = before.and_then(|t| t.rows.as_ref());
        let after_rows = after.and_then(|t| t.rows.as_ref());
        Ok(table_diff(self.store.as_ref(), before_rows, after_rows)?)
    }

    /// First half of `Merge`: reconcile one table's schema three ways. A returned `Err`
    /// carries the unresolved conflicts rather than a `DoltError`, since a schema conflict
    /// is something a caller presents to a user, not an I/O failure — mirrors
    /// `dolt_diff::merge_schema`'s own `Result<Schema, Vec<SchemaConflict>>` shape.
    pub fn merge_schema(&self, base: &Schema, ours: &Schema, theirs: &Schema) -> Result<Schema, Vec<SchemaConflict>> {
        merge_schema(base, ours, theirs)
    }

    /// Second half of `Merge`: three-way merge a table's row data, assuming `ours`/`theirs`
    /// are already encoded against a reconciled schema (the caller re-encodes rows against
    /// `merge_schema`'s output first if the merged schema reordered or widened columns).
    pub fn merge_rows(
        &self,
        base: Option<&dolt_prolly::ChildRef>,
        ours: Option<&dolt_prolly::ChildRef>,
        theirs: Option<&dolt_prolly::ChildRef>,
    ) -> Result<RowMergeResult, DoltError> {
        Ok(merge_rows(self.store.as_ref(), base, ours, theirs)?)
    }

    /// `ResolveRef`.
    pub fn resolve_ref(&self, name: &RefName) -> Result<Option<Hash>, DoltError> {
        Ok(self.refs.get(name)?)
    }

    /// `UpdateRef`.
    pub fn update_ref(&self, name: &RefName, expected: Option<Hash>, next: Hash) -> Result<bool, DoltError> {
        Ok(self.refs.cas(name, expected, next)?)
    }

    /// Loads the commit a ref currently points at, for `log`/ancestor resolution.
    pub fn load_commit(&self, hash: Hash) -> Result<Commit, DoltError> {
        Ok(decode_commit(&self.store.get(&hash)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_chunks::MemoryStore;
    use dolt_codec::Number;
    use dolt_schema::ColumnDescriptor;
    use dolt_schema::ColumnType;
    use dolt_versioning::MemoryRefStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn repo() -> Repo {
        Repo::new(Arc::new(MemoryStore::new()), Arc::new(MemoryRefStore::default()))
    }

    /// A `RefStore` wrapper that, the first time `get` is called, sneaks in a `cas` of its
    /// own before returning — simulating a concurrent writer landing between
    /// `commit_working_set`'s read of the current tip and its own `cas` of the new commit.
    struct RacingRefStore {
        inner: MemoryRefStore,
        fired: AtomicBool,
        race_branch: RefName,
        race_value: Hash,
    }

    impl RefStore for RacingRefStore {
        fn get(&self, name: &RefName) -> Result<Option<Hash>, dolt_versioning::VersioningError> {
            let current = self.inner.get(name)?;
            if name == &self.race_branch && !self.fired.swap(true, Ordering::SeqCst) {
                self.inner.cas(name, current, self.race_value)?;
            }
            self.inner.get(name)
        }

        fn cas(&self, name: &RefName, expected: Option<Hash>, next: Hash) -> Result<bool, dolt_versioning::VersioningError> {
            self.inner.cas(name, expected, next)
        }

        fn delete(&self, name: &RefName, expected: Hash) -> Result<bool, dolt_versioning::VersioningError> {
            self.inner.delete(name, expected)
        }

        fn list(&self, kind: dolt_versioning::RefKind) -> Result<Vec<RefName>, dolt_versioning::VersioningError> {
            self.inner.list(kind)
        }
    }

    fn meta() -> CommitMeta {
        CommitMeta { name: "Ada".to_string(), email: "ada@example.com".to_string(), timestamp: 0, description: "msg".to_string(), extra: vec![] }
    }

    #[test]
    fn open_root_of_the_empty_hash_is_the_default_root() {
        let repo = repo();
        let root = repo.open_root(Hash::EMPTY).unwrap();
        assert_eq!(root, RootValue::default());
    }

    #[test]
    fn put_table_then_get_table_roundtrips() {
        let repo = repo();
        let root = RootValue::default();
        let table = Table {
            schema: Hash::of_bytes(b"schema"),
            rows: None,
            indexes: vec![],
            autoinc: Number::from_i64(0),
            constraint_violations: None,
            conflicts: None,
        };
        let (root, _) = repo.put_table(&root, "accounts", &table).unwrap();
        let fetched = repo.get_table(&root, "accounts").unwrap().unwrap();
        assert_eq!(fetched, table);
        assert!(repo.get_table(&root, "missing").unwrap().is_none());
    }

    #[test]
    fn commit_working_set_chains_onto_the_branch_tip() {
        let repo = repo();
        let branch = RefName::branch("main").unwrap();
        let root_hash = repo.store.put(encode_root_value(&RootValue::default())).unwrap();

        let first = repo.commit_working_set(&branch, root_hash, meta()).unwrap();
        assert_eq!(repo.resolve_ref(&branch).unwrap(), Some(first));

        let second = repo.commit_working_set(&branch, root_hash, meta()).unwrap();
        let commit = repo.load_commit(second).unwrap();
        assert_eq!(commit.parents, vec![first]);
    }

    #[test]
    fn commit_working_set_on_a_stale_tip_is_a_cas_failure() {
        let branch = RefName::branch("main").unwrap();
        let racing = RacingRefStore {
            inner: MemoryRefStore::default(),
            fired: AtomicBool::new(false),
            race_branch: branch.clone(),
            race_value: Hash::of_bytes(b"someone-else's-commit"),
        };
        let repo = Repo::new(Arc::new(MemoryStore::new()), Arc::new(racing));
        let root_hash = repo.store.put(encode_root_value(&RootValue::default())).unwrap();

        let err = repo.commit_working_set(&branch, root_hash, meta()).unwrap_err();
        assert!(matches!(err, DoltError::RefCasFailed(name) if name == branch.to_string()));
    }

    #[test]
    fn merge_schema_reports_a_primary_key_conflict() {
        let repo = repo();
        let base = Schema {
            columns: vec![ColumnDescriptor {
                name: "id".to_string(),
                col_type: ColumnType::Int32,
                pk_position: Some(0),
                nullable: false,
                default: None,
                auto_increment: false,
            }],
            ..Schema::default()
        };
        let mut ours = base.clone();
        ours.columns[0].pk_position = None;
        let mut theirs = base.clone();
        theirs.columns[0].pk_position = Some(1);

        assert!(repo.merge_schema(&base, &ours, &theirs).is_err());
    }
}
