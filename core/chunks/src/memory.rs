use std::collections::HashMap;

use dolt_hash::Hash;
use parking_lot::Mutex;

use crate::{ChunkStore, ChunkStoreError};

/// A chunk store backed by a `HashMap` guarded by a single mutex. This is the default
/// backend for unit tests across every crate above this one (spec.md §4.2: "Backends:
/// in-memory, on-disk table files...").
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    chunks: HashMap<Hash, Vec<u8>>,
    root: Hash,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl ChunkStore for MemoryStore {
    fn has(&self, hash: &Hash) -> Result<bool, ChunkStoreError> {
        Ok(self.inner.lock().chunks.contains_key(hash))
    }

    fn get(&self, hash: &Hash) -> Result<Vec<u8>, ChunkStoreError> {
        self.inner.lock().chunks.get(hash).cloned().ok_or(ChunkStoreError::NotFound(*hash))
    }

    fn put(&self, bytes: Vec<u8>) -> Result<Hash, ChunkStoreError> {
        let hash = Hash::of_bytes(&bytes);
        self.inner.lock().chunks.entry(hash).or_insert(bytes);
        Ok(hash)
    }

    fn root(&self) -> Result<Hash, ChunkStoreError> {
        Ok(self.inner.lock().root)
    }

    fn commit(&self, last: Hash, next: Hash) -> Result<bool, ChunkStoreError> {
        let mut inner = self.inner.lock();
        if inner.root != last {
            return Ok(false);
        }
        inner.root = next;
        Ok(true)
    }

    fn sources(&self) -> Result<Vec<String>, ChunkStoreError> {
        Ok(vec!["memory".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent() {
        let store = MemoryStore::new();
        let h1 = store.put(vec![1, 2, 3]).unwrap();
        let h2 = store.put(vec![1, 2, 3]).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(store.get(&h1).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn commit_is_cas() {
        let store = MemoryStore::new();
        let root0 = store.root().unwrap();
        let fake = Hash::of_bytes(b"not the real root");
        assert!(!store.commit(fake, Hash::of_bytes(b"next")).unwrap());
        assert_eq!(store.root().unwrap(), root0);

        let next = Hash::of_bytes(b"next");
        assert!(store.commit(root0, next).unwrap());
        assert_eq!(store.root().unwrap(), next);
    }

    #[test]
    fn missing_chunk_is_not_found() {
        let store = MemoryStore::new();
        let h = Hash::of_bytes(b"absent");
        assert!(matches!(store.get(&h), Err(ChunkStoreError::NotFound(x)) if x == h));
    }
}
