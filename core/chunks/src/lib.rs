//! The content-addressed chunk store (spec.md §4.2).
//!
//! `ChunkStore` is the one interface every layer above it — prolly trees, the value
//! graph, the commit graph, the garbage collector — ultimately calls down into. Three
//! backends implement it: [`memory::MemoryStore`] (tests and ephemeral working state),
//! [`nbs::NbsStore`] (the on-disk table-file format from spec.md §6), and
//! [`remote::RemoteStore`] (push/pull against another store over a pluggable transport).

pub mod cache;
pub mod cancel;
pub mod memory;
pub mod nbs;
pub mod remote;

use std::collections::HashSet;

use dolt_hash::Hash;

pub use cache::ChunkCache;
pub use cancel::CancellationToken;
pub use memory::MemoryStore;
pub use nbs::{NbsConfig, NbsStore};
pub use remote::{LoopbackTransport, RemoteStore, RemoteTransport};

/// An immutable (hash, bytes) pair, per spec.md §3. `Chunk::new` is the only constructor,
/// so a `Chunk` can never have a hash that doesn't match its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    hash: Hash,
    bytes: Vec<u8>,
}

impl Chunk {
    pub fn new(bytes: Vec<u8>) -> Chunk {
        let hash = Hash::of_bytes(&bytes);
        Chunk { hash, bytes }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChunkStoreError {
    #[error("chunk {0} not found")]
    NotFound(Hash),
    #[error("corrupt chunk {hash}: {detail}")]
    Corruption { hash: Hash, detail: String },
    #[error("manifest CAS failed: expected root {expected}, found {actual}")]
    CasFailure { expected: Hash, actual: Hash },
    #[error("chunk store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("operation cancelled")]
    Cancelled,
}

/// Maps hash → bytes, with a single mutable "root" pointer updated by compare-and-swap.
/// spec.md §4.2.
pub trait ChunkStore: Send + Sync {
    fn has(&self, hash: &Hash) -> Result<bool, ChunkStoreError>;

    /// Returns the subset of `hashes` that is *absent* — the frontier push/pull still has
    /// to upload/download (spec.md §4.2: "absent subset used by push/pull").
    fn has_many(&self, hashes: &HashSet<Hash>) -> Result<HashSet<Hash>, ChunkStoreError> {
        let mut absent = HashSet::new();
        for hash in hashes {
            if !self.has(hash)? {
                absent.insert(*hash);
            }
        }
        Ok(absent)
    }

    fn get(&self, hash: &Hash) -> Result<Vec<u8>, ChunkStoreError>;

    /// Streams `(hash, bytes)` pairs into `sink` for every hash present in `hashes`, in
    /// unspecified order (spec.md §4.2).
    fn get_many(
        &self,
        hashes: &HashSet<Hash>,
        sink: &mut dyn FnMut(Hash, Vec<u8>),
    ) -> Result<(), ChunkStoreError> {
        for hash in hashes {
            if let Ok(bytes) = self.get(hash) {
                sink(*hash, bytes);
            }
        }
        Ok(())
    }

    /// Writes `bytes` if new; idempotent if the chunk is already present.
    fn put(&self, bytes: Vec<u8>) -> Result<Hash, ChunkStoreError>;

    fn root(&self) -> Result<Hash, ChunkStoreError>;

    /// Compare-and-swap the store's manifest root. Returns `false` (no side effects) if
    /// `last` does not match the current root.
    fn commit(&self, last: Hash, next: Hash) -> Result<bool, ChunkStoreError>;

    /// Enumerates the backing table files, for GC's sweep phase.
    fn sources(&self) -> Result<Vec<String>, ChunkStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_new_computes_matching_hash() {
        let c = Chunk::new(vec![7, 1, 2, 3]);
        assert_eq!(c.hash(), Hash::of_bytes(&[7, 1, 2, 3]));
    }
}
