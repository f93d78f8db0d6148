//! Integration coverage for the NBS on-disk backend (spec.md §4.2, §6), driving it purely
//! through its public `ChunkStore`/`NbsStore` surface against a real temp directory rather
//! than in-process unit fixtures.

use std::collections::HashSet;

use dolt_chunks::{ChunkStore, ChunkStoreError, NbsConfig, NbsStore};

#[test]
fn survives_a_close_and_reopen_with_multiple_flushed_tables() {
    let dir = tempfile::tempdir().unwrap();
    let config = NbsConfig { memtable_flush_bytes: 8 };

    let mut hashes = Vec::new();
    {
        let store = NbsStore::open(dir.path(), config.clone()).unwrap();
        for i in 0..20u8 {
            hashes.push(store.put(vec![i; 4]).unwrap());
        }
        assert!(store.sources().unwrap().len() > 1, "small flush threshold should produce several table files");
    }

    let store = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
    for (i, hash) in hashes.iter().enumerate() {
        assert_eq!(store.get(hash).unwrap(), vec![i as u8; 4]);
    }
}

#[test]
fn commit_cas_round_trips_across_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let root1 = dolt_hash::Hash::of_bytes(b"root-1");
    let root2 = dolt_hash::Hash::of_bytes(b"root-2");
    {
        let store = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
        let initial = store.root().unwrap();
        assert!(store.commit(initial, root1).unwrap());
    }
    let store = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
    assert_eq!(store.root().unwrap(), root1);
    assert!(!store.commit(dolt_hash::Hash::of_bytes(b"stale"), root2).unwrap());
    assert_eq!(store.root().unwrap(), root1);
}

#[test]
fn get_of_an_absent_hash_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
    let missing = dolt_hash::Hash::of_bytes(b"never written");
    assert!(matches!(store.get(&missing), Err(ChunkStoreError::NotFound(h)) if h == missing));
}

#[test]
fn has_many_reports_exactly_the_absent_subset() {
    let dir = tempfile::tempdir().unwrap();
    let store = NbsStore::open(dir.path(), NbsConfig { memtable_flush_bytes: 1 }).unwrap();
    let present = store.put(vec![1, 2, 3]).unwrap();
    let absent = dolt_hash::Hash::of_bytes(b"not written");

    let mut query = HashSet::new();
    query.insert(present);
    query.insert(absent);

    let missing = store.has_many(&query).unwrap();
    assert_eq!(missing, HashSet::from([absent]));
}

#[test]
fn sweep_after_reopen_keeps_only_reachable_chunks_across_table_files() {
    let dir = tempfile::tempdir().unwrap();
    let (live, dead) = {
        let store = NbsStore::open(dir.path(), NbsConfig { memtable_flush_bytes: 1 }).unwrap();
        let live = store.put(vec![10, 10, 10]).unwrap();
        let dead = store.put(vec![20, 20, 20]).unwrap();
        (live, dead)
    };

    let store = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
    let sources = store.sources().unwrap();
    assert_eq!(sources.len(), 2);

    let mut reachable = HashSet::new();
    reachable.insert(live);
    store.sweep(&sources, &reachable).unwrap();

    assert!(store.has(&live).unwrap());
    assert!(!store.has(&dead).unwrap());

    // The sweep's effect is durable across another reopen, not just visible to the same
    // in-memory `NbsStore` handle that performed it.
    let reopened = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
    assert!(reopened.has(&live).unwrap());
    assert!(!reopened.has(&dead).unwrap());
}
