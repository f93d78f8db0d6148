//! Commit graph, refs, and working sets (spec.md §3/§4.5): the mutable-state layer sitting
//! on top of the immutable chunk store and value graph.

pub mod commit;
pub mod graph;
pub mod refs;
pub mod root_value;
pub mod working_set;

pub use commit::{decode_commit, encode_commit, Commit, CommitChildExtractor, CommitMeta};
pub use graph::{merge_base, resolve_ancestor, AncestorSpec, CommitIterator};
pub use refs::{JsonRefStore, MemoryRefStore, RefKind, RefName, RefStore};
pub use root_value::{decode_root_value, encode_root_value, RootValue, RootValueChildExtractor};
pub use working_set::{MergeState, WorkingSet};

#[derive(Debug, thiserror::Error)]
pub enum VersioningError {
    #[error("ref not found")]
    RefNotFound,
    #[error("ref compare-and-swap failed")]
    CasFailure,
    #[error("invalid ref name: {0:?}")]
    InvalidRefName(String),
    #[error("corrupt commit/root-value chunk: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Store(#[from] dolt_chunks::ChunkStoreError),
    #[error("ref store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt repo_state.json: {0}")]
    CorruptRefState(String),
}
