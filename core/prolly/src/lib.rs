//! Prolly trees: content-defined-chunking search trees used for every ordered collection in
//! the value graph — table rows, secondary indexes, and the root value's table map itself
//! (spec.md §4.3).
//!
//! Construction in this crate always rebuilds the changed region of a [`Tree`] from its
//! full, sorted item sequence rather than patching nodes in place. Because chunk boundaries
//! are a pure function of item content (the rolling hash in [`chunker`]), two builds over
//! the same final sequence produce byte-identical chunks regardless of which edits got
//! there first — which is what gives prolly trees their two headline properties for free:
//! unchanged regions share chunks across revisions (spec.md §4.3, "structural sharing"),
//! and the final root hash does not depend on edit order (spec.md §8, Testable Property 3).

pub mod build;
pub mod chunker;
pub mod cursor;
pub mod diff;
pub mod node;
pub mod tree;

pub use build::build_tree;
pub use cursor::Cursor;
pub use diff::{diff, DiffEntry};
pub use node::{ChildRef, Node};
pub use tree::Tree;

#[derive(Debug, thiserror::Error)]
pub enum ProllyError {
    #[error("corrupt prolly node: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Store(#[from] dolt_chunks::ChunkStoreError),
}

impl ProllyError {
    pub(crate) fn codec(context: &str, source: dolt_codec::CodecError) -> ProllyError {
        ProllyError::Corrupt(format!("{context}: {source}"))
    }
}
