//! The value graph (spec.md §4.2, §4.4): the transitive-closure view over a chunk store
//! that every chunk is reachable from some set of named roots through. This crate supplies
//! the generic [`walker::Walker`] used by both the garbage collector's mark phase and
//! push/pull's frontier walk — the two operations that need "every chunk reachable from
//! here" rather than "this one chunk".
//!
//! Different chunks need different rules for "what does this chunk point at": a commit
//! points at a parent list and a root value; a prolly internal node points at its children;
//! a prolly leaf's row values may themselves hold refs to out-of-line blobs. Rather than one
//! universal decoder, callers supply a [`ChildExtractor`] that knows the chunk shapes live
//! at their layer (spec.md §4.2: cycles are structurally impossible, since a chunk is named
//! by a hash of its own content and can't reference itself).

pub mod prolly_extractor;
pub mod sync;
pub mod walker;

pub use prolly_extractor::ProllyChildExtractor;
pub use sync::{pull, push};
pub use walker::{ChildExtractor, Walker};

#[derive(Debug, thiserror::Error)]
pub enum ValueGraphError {
    #[error(transparent)]
    Store(#[from] dolt_chunks::ChunkStoreError),
    #[error("corrupt chunk while extracting child refs: {0}")]
    Corrupt(String),
}
