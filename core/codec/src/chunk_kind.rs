//! The chunk-kind tag shared across every stored chunk shape (spec.md §3/§6: "Bytes begin
//! with a one-byte kind tag"). Prolly leaf/internal nodes, commits, root values, and tables
//! each write one of these as the very first byte of their encoding, so a generic walker
//! (GC's reachability mark, in particular) can dispatch on an explicit tag rather than
//! guessing a chunk's shape by trying each decoder in turn.
//!
//! `dolt_prolly::Node` already wrote a leaf/internal tag as its first byte before this
//! module existed; `CHUNK_KIND_PROLLY_LEAF`/`CHUNK_KIND_PROLLY_INTERNAL` keep those same
//! values so adopting the shared scheme costs that crate nothing.

pub const CHUNK_KIND_PROLLY_LEAF: u8 = 0x00;
pub const CHUNK_KIND_PROLLY_INTERNAL: u8 = 0x01;
pub const CHUNK_KIND_COMMIT: u8 = 0x02;
pub const CHUNK_KIND_ROOT_VALUE: u8 = 0x03;
pub const CHUNK_KIND_TABLE: u8 = 0x04;
