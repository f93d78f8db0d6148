//! `DoltError` (spec.md §7 / SPEC_FULL.md §7): one variant per lower-layer crate's own
//! error enum, `#[from]`-wrapped, plus the handful of conditions that only make sense at
//! the facade (an optimistic ref update losing its race).

#[derive(Debug, thiserror::Error)]
pub enum DoltError {
    #[error(transparent)]
    Hash(#[from] dolt_hash::HashParseError),
    #[error(transparent)]
    Codec(#[from] dolt_codec::CodecError),
    #[error(transparent)]
    Store(#[from] dolt_chunks::ChunkStoreError),
    #[error(transparent)]
    Prolly(#[from] dolt_prolly::ProllyError),
    #[error(transparent)]
    ValueGraph(#[from] dolt_valuegraph::ValueGraphError),
    #[error(transparent)]
    Schema(#[from] dolt_schema::SchemaError),
    #[error(transparent)]
    Versioning(#[from] dolt_versioning::VersioningError),
    #[error(transparent)]
    Merge(#[from] dolt_diff::MergeError),
    #[error(transparent)]
    Gc(#[from] dolt_gc::GcError),
    #[error("ref {0} not found")]
    RefNotFound(String),
    #[error("compare-and-swap on ref {0} lost the race")]
    RefCasFailed(String),
}
