//! The ref store (spec.md §3: "a set of named pointers (branches, tags, remotes/*,
//! working-set/*), each mapping to one hash... stored outside the chunk store's
//! content-addressed space; it is the sole mutable state and the GC root set").
//!
//! SPEC_FULL.md §3 makes the namespacing explicit: `refs/heads/<branch>`, `refs/tags/<tag>`,
//! `refs/remotes/<remote>/<branch>`, `refs/workingsets/<branch>`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use dolt_hash::Hash;
use serde::{Deserialize, Serialize};

use crate::VersioningError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
    Remote,
    WorkingSet,
}

impl RefKind {
    fn prefix(self) -> &'static str {
        match self {
            RefKind::Branch => "refs/heads/",
            RefKind::Tag => "refs/tags/",
            RefKind::Remote => "refs/remotes/",
            RefKind::WorkingSet => "refs/workingsets/",
        }
    }
}

/// A validated, namespaced ref name such as `refs/heads/main` or
/// `refs/remotes/origin/main`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RefName {
    kind: RefKind,
    /// Everything after the namespace prefix (e.g. `main`, or `origin/main`).
    suffix: String,
}

impl RefName {
    pub fn new(kind: RefKind, suffix: impl Into<String>) -> Result<RefName, VersioningError> {
        let suffix = suffix.into();
        if suffix.is_empty()
            || suffix.starts_with('/')
            || suffix.ends_with('/')
            || suffix.contains("//")
            || suffix.contains(char::is_whitespace)
        {
            return Err(VersioningError::InvalidRefName(suffix));
        }
        if kind == RefKind::Remote && !suffix.contains('/') {
            return Err(VersioningError::InvalidRefName(suffix));
        }
        Ok(RefName { kind, suffix })
    }

    pub fn branch(name: impl Into<String>) -> Result<RefName, VersioningError> {
        RefName::new(RefKind::Branch, name)
    }

    pub fn working_set(branch: impl Into<String>) -> Result<RefName, VersioningError> {
        RefName::new(RefKind::WorkingSet, branch)
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.suffix)
    }
}

impl FromStr for RefName {
    type Err = VersioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for kind in [RefKind::Branch, RefKind::Tag, RefKind::Remote, RefKind::WorkingSet] {
            if let Some(suffix) = s.strip_prefix(kind.prefix()) {
                return RefName::new(kind, suffix);
            }
        }
        Err(VersioningError::InvalidRefName(s.to_string()))
    }
}

/// A set of named, CAS-updated pointers. spec.md §5: "Working sets are single-writer per
/// branch (enforced by a ref-level CAS); concurrent writers on the same branch serialize
/// via retry." The same discipline applies to every ref, not only working sets.
pub trait RefStore: Send + Sync {
    fn get(&self, name: &RefName) -> Result<Option<Hash>, VersioningError>;

    /// Compare-and-swap: succeeds and updates iff the current value equals `expected`
    /// (`None` meaning "ref must not currently exist").
    fn cas(&self, name: &RefName, expected: Option<Hash>, next: Hash) -> Result<bool, VersioningError>;

    fn delete(&self, name: &RefName, expected: Hash) -> Result<bool, VersioningError>;

    fn list(&self, kind: RefKind) -> Result<Vec<RefName>, VersioningError>;
}

/// An in-memory [`RefStore`], the default for tests (mirrors [`dolt_chunks::MemoryStore`]
/// for the chunk store).
#[derive(Default)]
pub struct MemoryRefStore {
    refs: Mutex<HashMap<RefName, Hash>>,
}

impl MemoryRefStore {
    pub fn new() -> MemoryRefStore {
        MemoryRefStore::default()
    }
}

impl RefStore for MemoryRefStore {
    fn get(&self, name: &RefName) -> Result<Option<Hash>, VersioningError> {
        Ok(self.refs.lock().unwrap().get(name).copied())
    }

    fn cas(&self, name: &RefName, expected: Option<Hash>, next: Hash) -> Result<bool, VersioningError> {
        let mut refs = self.refs.lock().unwrap();
        let current = refs.get(name).copied();
        if current != expected {
            return Ok(false);
        }
        refs.insert(name.clone(), next);
        Ok(true)
    }

    fn delete(&self, name: &RefName, expected: Hash) -> Result<bool, VersioningError> {
        let mut refs = self.refs.lock().unwrap();
        if refs.get(name).copied() != Some(expected) {
            return Ok(false);
        }
        refs.remove(name);
        Ok(true)
    }

    fn list(&self, kind: RefKind) -> Result<Vec<RefName>, VersioningError> {
        let refs = self.refs.lock().unwrap();
        Ok(refs.keys().filter(|n| n.kind == kind).cloned().collect())
    }
}

#[derive(Serialize, Deserialize, Default)]
struct RefStateFile {
    /// `RefName::to_string()` → hash text, so the file stays diffable (spec.md §6:
    /// `repo_state.json` is "outside the chunk store for human-debuggability").
    refs: HashMap<String, String>,
}

/// A `repo_state.json`-backed [`RefStore`] (spec.md §6): branch/tag/remote/working-set
/// heads persisted as a small `serde_json` document rather than chunk-store state, so a
/// repository directory's ref state is readable without decoding NBS. Every `cas` rewrites
/// the whole file via `repo_state.json.tmp` + atomic rename, mirroring the manifest's own
/// write discipline in `dolt_chunks::nbs`.
pub struct JsonRefStore {
    path: PathBuf,
    state: Mutex<RefStateFile>,
}

impl JsonRefStore {
    pub fn open(path: impl AsRef<Path>) -> Result<JsonRefStore, VersioningError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text).map_err(|e| VersioningError::CorruptRefState(e.to_string()))?
        } else {
            RefStateFile::default()
        };
        Ok(JsonRefStore { path, state: Mutex::new(state) })
    }

    fn write_locked(&self, state: &RefStateFile) -> Result<(), VersioningError> {
        let text = serde_json::to_string_pretty(state).map_err(|e| VersioningError::CorruptRefState(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RefStore for JsonRefStore {
    fn get(&self, name: &RefName) -> Result<Option<Hash>, VersioningError> {
        let state = self.state.lock().unwrap();
        match state.refs.get(&name.to_string()) {
            Some(text) => Ok(Some(text.parse().map_err(|_| VersioningError::CorruptRefState(text.clone()))?)),
            None => Ok(None),
        }
    }

    fn cas(&self, name: &RefName, expected: Option<Hash>, next: Hash) -> Result<bool, VersioningError> {
        let mut state = self.state.lock().unwrap();
        let current = match state.refs.get(&name.to_string()) {
            Some(text) => Some(text.parse().map_err(|_| VersioningError::CorruptRefState(text.clone()))?),
            None => None,
        };
        if current != expected {
            return Ok(false);
        }
        state.refs.insert(name.to_string(), next.to_string());
        self.write_locked(&state)?;
        Ok(true)
    }

    fn delete(&self, name: &RefName, expected: Hash) -> Result<bool, VersioningError> {
        let mut state = self.state.lock().unwrap();
        let current = state.refs.get(&name.to_string()).and_then(|t| t.parse().ok());
        if current != Some(expected) {
            return Ok(false);
        }
        state.refs.remove(&name.to_string());
        self.write_locked(&state)?;
        Ok(true)
    }

    fn list(&self, kind: RefKind) -> Result<Vec<RefName>, VersioningError> {
        let state = self.state.lock().unwrap();
        state.refs.keys().filter(|k| k.starts_with(kind.prefix())).map(|k| k.parse()).collect()
    }
}
