//! Working sets (spec.md §3: "Struct{staged_root: ref<RootValue>, working_root: ref<RootValue>,
//! merge_state: optional Struct}. One working set per branch checkout."). Unlike commits and
//! root values, a working set is not a content-addressed chunk: SPEC_FULL.md §6 places it at
//! `R/.dolt/workingsets/<branch>`, "a small file referencing a RootValue hash pair" — so it is
//! `serde`-serialized (matching `repo_state.json`'s own human-debuggable `serde_json` form),
//! not hashed and stored through the chunk store.

use serde::{Deserialize, Serialize};

use dolt_hash::Hash;

/// Recorded while a merge has left unresolved conflicts, so the working set can be
/// restored (or the merge abandoned) without losing the pre-merge working root. spec.md
/// §4.6 does not fix this shape; it is resolved here per SPEC_FULL.md's Open Question
/// policy of pinning ambiguous structures with a documented decision (see DESIGN.md).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeState {
    /// The working root immediately before the merge began, restored on `merge --abort`.
    pub pre_merge_working: Hash,
    /// The commit being merged in (spec.md §4.6's "theirs").
    pub from_commit: Hash,
    /// True once a merge has left row- or schema-level conflicts requiring resolution
    /// before the working set can be committed.
    pub has_conflicts: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingSet {
    pub staged_root: Hash,
    pub working_root: Hash,
    pub merge_state: Option<MergeState>,
}

impl WorkingSet {
    pub fn clean(root: Hash) -> WorkingSet {
        WorkingSet { staged_root: root, working_root: root, merge_state: None }
    }

    pub fn is_merging(&self) -> bool {
        self.merge_state.is_some()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("WorkingSet serializes")
    }

    pub fn from_json(s: &str) -> serde_json::Result<WorkingSet> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_working_set_has_matching_staged_and_working_roots() {
        let ws = WorkingSet::clean(Hash::of_bytes(b"root"));
        assert_eq!(ws.staged_root, ws.working_root);
        assert!(!ws.is_merging());
    }

    #[test]
    fn working_set_roundtrips_through_json() {
        let ws = WorkingSet {
            staged_root: Hash::of_bytes(b"staged"),
            working_root: Hash::of_bytes(b"working"),
            merge_state: Some(MergeState {
                pre_merge_working: Hash::of_bytes(b"pre"),
                from_commit: Hash::of_bytes(b"theirs"),
                has_conflicts: true,
            }),
        };
        let json = ws.to_json();
        let decoded = WorkingSet::from_json(&json).unwrap();
        assert_eq!(decoded, ws);
    }
}
