//! NBS: the on-disk, append-only table-file chunk store (spec.md §4.2, §6).
//!
//! A store directory holds one `manifest` file and any number of table files. Writers
//! buffer novel chunks in an in-memory memtable; once it crosses
//! [`NbsConfig::memtable_flush_bytes`] the memtable is serialized into a fresh table file
//! and a new manifest version is written via `manifest.tmp` + atomic rename. Readers
//! consult the memtable first, then each table file's trailing index (kept in memory).

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use dolt_hash::Hash;
use fs2::FileExt;
use parking_lot::Mutex;

use crate::{ChunkStore, ChunkStoreError};

const MANIFEST_FILE: &str = "manifest";
const MANIFEST_TMP: &str = "manifest.tmp";
const LOCK_FILE: &str = "manifest.lock";
const VERSION_TAG: &str = "dolt-nbs";
const FORMAT_TAG: &str = "1";
const TABLE_MAGIC: &[u8; 4] = b"DTBL";

#[derive(Clone, Debug)]
pub struct NbsConfig {
    /// Flush the memtable into a new table file once its buffered bytes exceed this.
    pub memtable_flush_bytes: usize,
}

impl Default for NbsConfig {
    fn default() -> Self {
        NbsConfig { memtable_flush_bytes: 4 * 1024 * 1024 }
    }
}

struct Manifest {
    lock_seq: u64,
    root: Hash,
    tables: Vec<(String, u64)>,
}

impl Manifest {
    fn fresh() -> Manifest {
        Manifest { lock_seq: 0, root: Hash::EMPTY, tables: Vec::new() }
    }

    fn parse(text: &str) -> Result<Manifest, ChunkStoreError> {
        let mut lines = text.lines();
        let version_tag = lines.next().unwrap_or_default();
        let format_tag = lines.next().unwrap_or_default();
        if version_tag != VERSION_TAG || format_tag != FORMAT_TAG {
            return Err(ChunkStoreError::Corruption {
                hash: Hash::EMPTY,
                detail: format!("unrecognized manifest version {version_tag}/{format_tag}"),
            });
        }
        let lock_seq: u64 = lines
            .next()
            .unwrap_or("0")
            .parse()
            .map_err(|_| corrupt("manifest lock sequence is not a number"))?;
        let root_text = lines.next().unwrap_or_default();
        let root: Hash = root_text.parse().map_err(|_| corrupt("manifest root hash is invalid"))?;
        let mut tables = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split(' ');
            let name = parts.next().ok_or_else(|| corrupt("table file line missing name"))?;
            let count: u64 = parts
                .next()
                .ok_or_else(|| corrupt("table file line missing chunk count"))?
                .parse()
                .map_err(|_| corrupt("table file chunk count is not a number"))?;
            tables.push((name.to_string(), count));
        }
        Ok(Manifest { lock_seq, root, tables })
    }

    fn render(&self) -> String {
        let mut out = format!("{VERSION_TAG}\n{FORMAT_TAG}\n{}\n{}\n", self.lock_seq, self.root);
        for (name, count) in &self.tables {
            out.push_str(&format!("{name} {count}\n"));
        }
        out
    }
}

fn corrupt(detail: &str) -> ChunkStoreError {
    ChunkStoreError::Corruption { hash: Hash::EMPTY, detail: detail.to_string() }
}

/// In-memory index of one table file: hash → (byte offset of payload, payload length).
type TableIndex = HashMap<Hash, (u64, u64)>;

struct State {
    manifest: Manifest,
    memtable: HashMap<Hash, Vec<u8>>,
    memtable_size: usize,
    /// Loaded indexes for every table file named in the manifest.
    indexes: HashMap<String, TableIndex>,
}

pub struct NbsStore {
    dir: PathBuf,
    config: NbsConfig,
    state: Mutex<State>,
}

impl NbsStore {
    /// Opens (or initializes) a store directory. A partial table-file write that never
    /// reached the manifest is ignored, since it isn't named in `manifest`'s table list
    /// (spec.md §4.2 failure semantics).
    pub fn open(dir: impl AsRef<Path>, config: NbsConfig) -> Result<NbsStore, ChunkStoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let text = fs::read_to_string(&manifest_path)?;
            Manifest::parse(&text)?
        } else {
            Manifest::fresh()
        };
        let mut indexes = HashMap::new();
        for (name, _) in &manifest.tables {
            let index = load_table_index(&dir, name)?;
            indexes.insert(name.clone(), index);
        }
        let store = NbsStore {
            dir,
            config,
            state: Mutex::new(State { manifest, memtable: HashMap::new(), memtable_size: 0, indexes }),
        };
        tracing::debug!(dir = %store.dir.display(), tables = store.state.lock().manifest.tables.len(), "opened NBS store");
        Ok(store)
    }

    /// The directory backing this store, for callers (e.g. `dolt-gc`) that need to hold
    /// their own advisory lock file alongside the manifest lock.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn acquire_file_lock(&self) -> Result<File, ChunkStoreError> {
        let file = OpenOptions::new().create(true).write(true).open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(file)
    }

    /// Serializes the memtable into a fresh table file and appends it to the manifest.
    /// Caller must hold both `state`'s mutex and the manifest file lock already (spec.md
    /// §4.2: "Manifest updates are serialized by an advisory file lock").
    fn flush_locked(&self, state: &mut State) -> Result<(), ChunkStoreError> {
        if state.memtable.is_empty() {
            return Ok(());
        }
        let mut entries: Vec<(Hash, Vec<u8>)> = state.memtable.drain().collect();
        entries.sort_by_key(|(h, _)| *h);
        let table_name = entries.first().map(|(h, _)| h.to_string()).unwrap_or_default();
        let table_path = self.dir.join(&table_name);
        let mut file = File::create(&table_path)?;
        file.write_all(TABLE_MAGIC)?;
        let mut index: TableIndex = HashMap::new();
        let mut offset = TABLE_MAGIC.len() as u64;
        for (hash, bytes) in &entries {
            file.write_all(hash.as_bytes())?;
            let len = bytes.len() as u64;
            file.write_all(&len.to_le_bytes())?;
            file.write_all(bytes)?;
            let payload_offset = offset + dolt_hash::HASH_LEN as u64 + 8;
            index.insert(*hash, (payload_offset, len));
            offset = payload_offset + len;
        }
        file.write_all(b"DFTR")?; // footer magic
        file.write_all(&(entries.len() as u64).to_le_bytes())?;
        file.sync_all()?;

        state.manifest.tables.push((table_name.clone(), entries.len() as u64));
        state.manifest.lock_seq += 1;
        state.indexes.insert(table_name, index);
        state.memtable_size = 0;
        self.write_manifest(&state.manifest)?;
        Ok(())
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<(), ChunkStoreError> {
        let tmp_path = self.dir.join(MANIFEST_TMP);
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(manifest.render().as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, self.dir.join(MANIFEST_FILE))?;
        Ok(())
    }

    fn read_chunk_from_table(&self, name: &str, offset: u64, len: u64) -> Result<Vec<u8>, ChunkStoreError> {
        let mut file = File::open(self.dir.join(name))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// GC's sweep phase (spec.md §4.7): rewrites the table files named in `swept_sources`
    /// into a single fresh table file holding only the chunks present in `reachable`, then
    /// atomically swaps the manifest to drop the swept names and add the fresh one.
    ///
    /// A source flushed by a concurrent writer after `swept_sources` was captured is never
    /// named in it, so it's left untouched in the manifest — exactly the "manifest swap
    /// preserves any table files produced during the run" rule from spec.md §4.7.
    pub fn sweep(&self, swept_sources: &[String], reachable: &HashSet<Hash>) -> Result<(), ChunkStoreError> {
        let _file_lock = self.acquire_file_lock()?;
        let mut state = self.state.lock();
        self.reload_manifest_locked(&mut state)?;

        let mut fresh_entries: Vec<(Hash, Vec<u8>)> = Vec::new();
        for name in swept_sources {
            let Some(index) = state.indexes.get(name).cloned() else { continue };
            for (hash, (offset, len)) in index {
                if reachable.contains(&hash) {
                    fresh_entries.push((hash, self.read_chunk_from_table(name, offset, len)?));
                }
            }
        }
        fresh_entries.sort_by_key(|(h, _)| *h);

        let mut new_tables: Vec<(String, u64)> =
            state.manifest.tables.iter().filter(|(name, _)| !swept_sources.contains(name)).cloned().collect();

        if !fresh_entries.is_empty() {
            let table_name = fresh_entries.first().map(|(h, _)| h.to_string()).unwrap();
            let table_path = self.dir.join(&table_name);
            let mut file = File::create(&table_path)?;
            file.write_all(TABLE_MAGIC)?;
            let mut index: TableIndex = HashMap::new();
            let mut offset = TABLE_MAGIC.len() as u64;
            for (hash, bytes) in &fresh_entries {
                file.write_all(hash.as_bytes())?;
                let len = bytes.len() as u64;
                file.write_all(&len.to_le_bytes())?;
                file.write_all(bytes)?;
                let payload_offset = offset + dolt_hash::HASH_LEN as u64 + 8;
                index.insert(*hash, (payload_offset, len));
                offset = payload_offset + len;
            }
            file.write_all(b"DFTR")?;
            file.write_all(&(fresh_entries.len() as u64).to_le_bytes())?;
            file.sync_all()?;
            new_tables.push((table_name.clone(), fresh_entries.len() as u64));
            state.indexes.insert(table_name, index);
        }

        for name in swept_sources {
            state.indexes.remove(name);
        }
        state.manifest.tables = new_tables;
        state.manifest.lock_seq += 1;
        self.write_manifest(&state.manifest)?;

        // Old files are only unlinked after the manifest rename succeeds, so a crash
        // between the two leaves orphan files that the next `open` simply never indexes
        // (spec.md §4.7: "interruption after rename but before old-file deletion leaves
        // orphan files safely cleaned on next startup" — cleanup itself is left to a
        // future startup sweep; this call just stops referencing them).
        for name in swept_sources {
            let path = self.dir.join(name);
            if path.exists() {
                let _ = fs::remove_file(path);
            }
        }
        Ok(())
    }

    /// Re-reads `manifest` from disk, picking up table files written by a concurrent GC
    /// or writer (spec.md §4.7 concurrency notes).
    fn reload_manifest_locked(&self, state: &mut State) -> Result<(), ChunkStoreError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Ok(());
        }
        let text = fs::read_to_string(&manifest_path)?;
        let fresh = Manifest::parse(&text)?;
        for (name, _) in &fresh.tables {
            if !state.indexes.contains_key(name) {
                let index = load_table_index(&self.dir, name)?;
                state.indexes.insert(name.clone(), index);
            }
        }
        state.manifest = fresh;
        Ok(())
    }
}

fn load_table_index(dir: &Path, name: &str) -> Result<TableIndex, ChunkStoreError> {
    let mut file = File::open(dir.join(name))?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if &magic != TABLE_MAGIC {
        return Err(corrupt("table file missing magic header"));
    }
    let mut index = TableIndex::new();
    let mut offset = 4u64;
    let file_len = file.metadata()?.len();
    // Footer is 12 bytes: 4-byte magic + 8-byte count; stop scanning before it.
    while offset + dolt_hash::HASH_LEN as u64 + 8 < file_len {
        let mut hash_bytes = [0u8; dolt_hash::HASH_LEN];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut hash_bytes)?;
        let hash = Hash::from_bytes(hash_bytes);
        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);
        let payload_offset = offset + dolt_hash::HASH_LEN as u64 + 8;
        if payload_offset + len > file_len {
            break; // reached the footer
        }
        index.insert(hash, (payload_offset, len));
        offset = payload_offset + len;
    }
    Ok(index)
}

impl ChunkStore for NbsStore {
    fn has(&self, hash: &Hash) -> Result<bool, ChunkStoreError> {
        let state = self.state.lock();
        if state.memtable.contains_key(hash) {
            return Ok(true);
        }
        Ok(state.indexes.values().any(|idx| idx.contains_key(hash)))
    }

    fn get(&self, hash: &Hash) -> Result<Vec<u8>, ChunkStoreError> {
        let (table, offset, len) = {
            let state = self.state.lock();
            if let Some(bytes) = state.memtable.get(hash) {
                return Ok(bytes.clone());
            }
            let mut found = None;
            for (name, index) in state.indexes.iter() {
                if let Some((offset, len)) = index.get(hash) {
                    found = Some((name.clone(), *offset, *len));
                    break;
                }
            }
            found.ok_or(ChunkStoreError::NotFound(*hash))?
        };
        self.read_chunk_from_table(&table, offset, len)
    }

    fn put(&self, bytes: Vec<u8>) -> Result<Hash, ChunkStoreError> {
        let hash = Hash::of_bytes(&bytes);
        if self.has(&hash)? {
            return Ok(hash);
        }
        let mut state = self.state.lock();
        let size = bytes.len();
        state.memtable.entry(hash).or_insert_with(|| {
            tracing::trace!(%hash, "buffering novel chunk in memtable");
            bytes
        });
        state.memtable_size += size;
        if state.memtable_size >= self.config.memtable_flush_bytes {
            let _file_lock = self.acquire_file_lock()?;
            self.flush_locked(&mut state)?;
        }
        Ok(hash)
    }

    fn root(&self) -> Result<Hash, ChunkStoreError> {
        Ok(self.state.lock().manifest.root)
    }

    fn commit(&self, last: Hash, next: Hash) -> Result<bool, ChunkStoreError> {
        let _file_lock = self.acquire_file_lock()?;
        let mut state = self.state.lock();
        self.reload_manifest_locked(&mut state)?;
        if state.manifest.root != last {
            tracing::debug!(expected = %last, actual = %state.manifest.root, "manifest CAS lost the race");
            return Ok(false);
        }
        self.flush_locked(&mut state)?;
        state.manifest.root = next;
        state.manifest.lock_seq += 1;
        self.write_manifest(&state.manifest)?;
        Ok(true)
    }

    fn sources(&self) -> Result<Vec<String>, ChunkStoreError> {
        Ok(self.state.lock().manifest.tables.iter().map(|(name, _)| name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_get_roundtrip_with_flush() {
        let dir = tempdir().unwrap();
        let store = NbsStore::open(dir.path(), NbsConfig { memtable_flush_bytes: 16 }).unwrap();
        let h1 = store.put(vec![1; 20]).unwrap(); // forces an immediate flush
        let h2 = store.put(vec![2; 4]).unwrap();
        assert_eq!(store.get(&h1).unwrap(), vec![1; 20]);
        assert_eq!(store.get(&h2).unwrap(), vec![2; 4]);
        assert!(store.has(&h1).unwrap());
    }

    #[test]
    fn reopen_sees_flushed_chunks() {
        let dir = tempdir().unwrap();
        let hash;
        {
            let store = NbsStore::open(dir.path(), NbsConfig { memtable_flush_bytes: 1 }).unwrap();
            hash = store.put(vec![9, 9, 9]).unwrap();
        }
        let store = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
        assert_eq!(store.get(&hash).unwrap(), vec![9, 9, 9]);
    }

    #[test]
    fn commit_cas_semantics() {
        let dir = tempdir().unwrap();
        let store = NbsStore::open(dir.path(), NbsConfig::default()).unwrap();
        let root0 = store.root().unwrap();
        let next = Hash::of_bytes(b"next-root");
        assert!(!store.commit(Hash::of_bytes(b"wrong"), next).unwrap());
        assert_eq!(store.root().unwrap(), root0);
        assert!(store.commit(root0, next).unwrap());
        assert_eq!(store.root().unwrap(), next);
    }

    #[test]
    fn sources_lists_table_files_after_flush() {
        let dir = tempdir().unwrap();
        let store = NbsStore::open(dir.path(), NbsConfig { memtable_flush_bytes: 1 }).unwrap();
        store.put(vec![1, 2, 3]).unwrap();
        assert_eq!(store.sources().unwrap().len(), 1);
    }

    #[test]
    fn sweep_drops_unreachable_chunks_and_keeps_reachable_ones() {
        let dir = tempdir().unwrap();
        let store = NbsStore::open(dir.path(), NbsConfig { memtable_flush_bytes: 1 }).unwrap();
        let live = store.put(vec![1, 1, 1]).unwrap();
        let dead = store.put(vec![2, 2, 2]).unwrap();
        let swept_sources = store.sources().unwrap();
        assert_eq!(swept_sources.len(), 2);

        let mut reachable = HashSet::new();
        reachable.insert(live);
        store.sweep(&swept_sources, &reachable).unwrap();

        assert!(store.has(&live).unwrap());
        assert!(!store.has(&dead).unwrap());
        assert_eq!(store.sources().unwrap().len(), 1);
    }

    #[test]
    fn sweep_preserves_a_source_written_after_mark_started() {
        let dir = tempdir().unwrap();
        let store = NbsStore::open(dir.path(), NbsConfig { memtable_flush_bytes: 1 }).unwrap();
        let dead = store.put(vec![3, 3, 3]).unwrap();
        let swept_sources = store.sources().unwrap();

        // A concurrent writer flushes a new table file after the mark phase captured
        // `swept_sources`.
        let fresh = store.put(vec![4, 4, 4]).unwrap();

        store.sweep(&swept_sources, &HashSet::new()).unwrap();

        assert!(!store.has(&dead).unwrap());
        assert!(store.has(&fresh).unwrap());
    }
}
