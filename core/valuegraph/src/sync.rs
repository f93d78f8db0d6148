//! Push and pull: the frontier walk described in spec.md §4.2 — "closure via repeated
//! `HasMany` on the frontier" — rather than a full local closure computed up front. A chunk
//! the far side already has is assumed to already have its whole subtree too (a chunk's
//! children are fixed forever, since its hash is content-addressed), so the walk never
//! descends past the first chunk each side already holds. This is what keeps an incremental
//! push/pull proportional to what changed rather than to the whole history.

use std::collections::HashSet;

use dolt_chunks::{CancellationToken, ChunkStore, RemoteTransport};
use dolt_hash::Hash;
use tracing::debug;

use crate::walker::ChildExtractor;
use crate::ValueGraphError;

/// Uploads every chunk reachable from `roots` that the remote doesn't already have.
/// Returns the number of chunks uploaded.
pub fn push(
    local: &dyn ChunkStore,
    transport: &dyn RemoteTransport,
    extractor: &dyn ChildExtractor,
    roots: HashSet<Hash>,
    cancel: &CancellationToken,
) -> Result<usize, ValueGraphError> {
    let mut frontier: HashSet<Hash> = roots.into_iter().filter(|h| !h.is_empty()).collect();
    let mut visited: HashSet<Hash> = HashSet::new();
    let mut uploaded = 0usize;

    while !frontier.is_empty() {
        cancel.check()?;
        let absent_at_remote = transport.has_many(&frontier)?;
        let mut next_frontier = HashSet::new();
        let mut batch = Vec::new();

        for hash in &frontier {
            if !visited.insert(*hash) {
                continue;
            }
            if !absent_at_remote.contains(hash) {
                // Remote already has this chunk, so (by content-addressing) it already has
                // everything under it too; don't walk further down this branch.
                continue;
            }
            let bytes = local.get(hash)?;
            for child in extractor.children(*hash, &bytes)? {
                if !child.is_empty() {
                    next_frontier.insert(child);
                }
            }
            batch.push((*hash, bytes));
        }

        if !batch.is_empty() {
            debug!(count = batch.len(), "uploading chunk batch");
            uploaded += batch.len();
            transport.put_many(batch)?;
        }
        frontier = next_frontier;
    }
    Ok(uploaded)
}

/// Downloads every chunk reachable from `roots` that the local store doesn't already have.
/// Returns the number of chunks downloaded.
pub fn pull(
    local: &dyn ChunkStore,
    transport: &dyn RemoteTransport,
    extractor: &dyn ChildExtractor,
    roots: HashSet<Hash>,
    cancel: &CancellationToken,
) -> Result<usize, ValueGraphError> {
    let mut frontier: HashSet<Hash> = roots.into_iter().filter(|h| !h.is_empty()).collect();
    let mut visited: HashSet<Hash> = HashSet::new();
    let mut downloaded = 0usize;

    while !frontier.is_empty() {
        cancel.check()?;
        let missing_locally = local.has_many(&frontier)?;
        let mut next_frontier = HashSet::new();
        let mut to_fetch = HashSet::new();

        for hash in &frontier {
            if !visited.insert(*hash) {
                continue;
            }
            if missing_locally.contains(hash) {
                to_fetch.insert(*hash);
            }
            // Already present locally: assume its subtree is too, don't descend.
        }

        if to_fetch.is_empty() {
            frontier = next_frontier;
            continue;
        }

        let fetched = transport.get_many(&to_fetch)?;
        debug!(count = fetched.len(), "downloaded chunk batch");
        downloaded += fetched.len();
        for (hash, bytes) in fetched {
            for child in extractor.children(hash, &bytes)? {
                if !child.is_empty() {
                    next_frontier.insert(child);
                }
            }
            local.put(bytes)?;
        }
        frontier = next_frontier;
    }
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_chunks::{LoopbackTransport, MemoryStore};
    use std::sync::Arc;

    struct LinkedListExtractor;

    impl ChildExtractor for LinkedListExtractor {
        fn children(&self, _hash: Hash, bytes: &[u8]) -> Result<Vec<Hash>, ValueGraphError> {
            if bytes.len() < 20 {
                return Ok(vec![]);
            }
            let mut arr = [0u8; 20];
            arr.copy_from_slice(&bytes[..20]);
            let next = Hash::from_bytes(arr);
            Ok(if next.is_empty() { vec![] } else { vec![next] })
        }
    }

    fn chain(store: &MemoryStore) -> Hash {
        let tail = store.put(b"tail".to_vec()).unwrap();
        let mut middle_bytes = tail.as_bytes().to_vec();
        middle_bytes.extend_from_slice(b"-middle");
        let middle = store.put(middle_bytes).unwrap();
        let mut head_bytes = middle.as_bytes().to_vec();
        head_bytes.extend_from_slice(b"-head");
        store.put(head_bytes).unwrap()
    }

    #[test]
    fn push_uploads_the_full_chain_once() {
        let local = MemoryStore::new();
        let head = chain(&local);
        let remote_store = MemoryStore::new();
        let transport = LoopbackTransport::new(remote_store);
        let extractor = LinkedListExtractor;

        let uploaded = push(&local, &transport, &extractor, [head].into_iter().collect(), &CancellationToken::new())
            .unwrap();
        assert_eq!(uploaded, 3);

        // A second push finds nothing new to do.
        let uploaded_again =
            push(&local, &transport, &extractor, [head].into_iter().collect(), &CancellationToken::new()).unwrap();
        assert_eq!(uploaded_again, 0);
    }

    #[test]
    fn pull_downloads_only_whats_missing() {
        let remote_backing = MemoryStore::new();
        let head = chain(&remote_backing);
        let transport = LoopbackTransport::new(remote_backing);
        let extractor = LinkedListExtractor;

        let local = MemoryStore::new();
        let downloaded =
            pull(&local, &transport, &extractor, [head].into_iter().collect(), &CancellationToken::new()).unwrap();
        assert_eq!(downloaded, 3);
        assert!(local.has(&head).unwrap());

        let downloaded_again =
            pull(&local, &transport, &extractor, [head].into_iter().collect(), &CancellationToken::new()).unwrap();
        assert_eq!(downloaded_again, 0);
    }
}
