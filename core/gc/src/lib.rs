//! The garbage collector (spec.md §4.7): mark every chunk reachable from the named refs,
//! then rewrite each backing table file to hold only what survived.
//!
//! `mark` is backend-agnostic (any [`dolt_chunks::ChunkStore`]); `sweep`/[`collect_garbage`]
//! is inherently tied to the on-disk NBS table-file format spec.md describes, so it's
//! built directly against [`dolt_chunks::NbsStore`] rather than the generic trait —
//! [`dolt_chunks::MemoryStore`] has no file-level compaction to perform, and sweeping a
//! remote store is a server-side concern out of scope here (see `dolt_chunks::remote`'s own
//! framing of the wire protocol as an external collaborator).

pub mod epoch;
pub mod extractor;
pub mod mark;
pub mod reachable;
pub mod sweep;

pub use epoch::{acquire_epoch, GcEpochGuard};
pub use extractor::GcChildExtractor;
pub use mark::mark;
pub use reachable::{ExactReachableSet, ReachableSet};
pub use sweep::collect_garbage;

#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error("a GC epoch is already in progress for this store")]
    EpochLocked,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] dolt_chunks::ChunkStoreError),
    #[error(transparent)]
    ValueGraph(#[from] dolt_valuegraph::ValueGraphError),
}
