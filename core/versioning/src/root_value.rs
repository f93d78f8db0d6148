//! RootValue chunk encoding (spec.md §3: "RootValue. Struct{tables: Map<String, ref<Table>>,
//! foreign_keys: …, schemas_metadata: …}"). `tables` is kept as a plain name-sorted vector
//! rather than a full prolly tree: a repository's table count is small (tens, not millions),
//! spec.md doesn't mandate prolly specifically at this top level (only for row/index data in
//! §4.3), and a flat vector is both simpler to diff and cheaper to hash for the common case.
//! `foreign_keys`/`schemas_metadata` are opaque blobs here: they are interpreted by the schema
//! layer, which this crate deliberately does not depend on (versioning is schema-agnostic).

use dolt_codec::CHUNK_KIND_ROOT_VALUE;
use dolt_hash::{Hash, HASH_LEN};
use dolt_valuegraph::ChildExtractor;

use crate::VersioningError;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RootValue {
    /// (table name, table chunk hash), sorted by name.
    pub tables: Vec<(String, Hash)>,
    pub foreign_keys: Vec<u8>,
    pub schemas_metadata: Vec<u8>,
}

impl RootValue {
    pub fn table(&self, name: &str) -> Option<Hash> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, h)| *h)
    }

    /// Returns a copy with `name` mapped to `hash`, inserted/replaced in sorted order.
    pub fn with_table(&self, name: &str, hash: Hash) -> RootValue {
        let mut tables: Vec<(String, Hash)> = self.tables.iter().filter(|(n, _)| n != name).cloned().collect();
        tables.push((name.to_string(), hash));
        tables.sort_by(|a, b| a.0.cmp(&b.0));
        RootValue { tables, foreign_keys: self.foreign_keys.clone(), schemas_metadata: self.schemas_metadata.clone() }
    }

    /// Returns a copy with `name` removed, if present.
    pub fn without_table(&self, name: &str) -> RootValue {
        let tables = self.tables.iter().filter(|(n, _)| n != name).cloned().collect();
        RootValue { tables, foreign_keys: self.foreign_keys.clone(), schemas_metadata: self.schemas_metadata.clone() }
    }
}

pub struct RootValueChildExtractor;

impl ChildExtractor for RootValueChildExtractor {
    fn children(&self, _hash: Hash, bytes: &[u8]) -> Result<Vec<Hash>, dolt_valuegraph::ValueGraphError> {
        let root = decode_root_value(bytes).map_err(|e| dolt_valuegraph::ValueGraphError::Corrupt(e.to_string()))?;
        Ok(root.tables.into_iter().map(|(_, h)| h).collect())
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, VersioningError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*pos).ok_or_else(|| VersioningError::Corrupt("truncated varint".to_string()))?;
        *pos += 1;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    write_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn read_string(buf: &[u8], pos: &mut usize) -> Result<String, VersioningError> {
    let len = read_varint(buf, pos)? as usize;
    let bytes = buf.get(*pos..*pos + len).ok_or_else(|| VersioningError::Corrupt("truncated string".to_string()))?;
    *pos += len;
    String::from_utf8(bytes.to_vec()).map_err(|_| VersioningError::Corrupt("invalid utf8".to_string()))
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn read_bytes(buf: &[u8], pos: &mut usize) -> Result<Vec<u8>, VersioningError> {
    let len = read_varint(buf, pos)? as usize;
    let bytes = buf.get(*pos..*pos + len).ok_or_else(|| VersioningError::Corrupt("truncated bytes".to_string()))?;
    *pos += len;
    Ok(bytes.to_vec())
}

fn write_hash(out: &mut Vec<u8>, hash: &Hash) {
    out.extend_from_slice(hash.as_bytes());
}

fn read_hash(buf: &[u8], pos: &mut usize) -> Result<Hash, VersioningError> {
    let bytes = buf.get(*pos..*pos + HASH_LEN).ok_or_else(|| VersioningError::Corrupt("truncated hash".to_string()))?;
    let mut arr = [0u8; HASH_LEN];
    arr.copy_from_slice(bytes);
    *pos += HASH_LEN;
    Ok(Hash::from_bytes(arr))
}

pub fn encode_root_value(root: &RootValue) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(CHUNK_KIND_ROOT_VALUE);
    write_varint(&mut out, root.tables.len() as u64);
    for (name, hash) in &root.tables {
        write_string(&mut out, name);
        write_hash(&mut out, hash);
    }
    write_bytes(&mut out, &root.foreign_keys);
    write_bytes(&mut out, &root.schemas_metadata);
    out
}

pub fn decode_root_value(bytes: &[u8]) -> Result<RootValue, VersioningError> {
    let tag = *bytes.first().ok_or_else(|| VersioningError::Corrupt("empty root value chunk".to_string()))?;
    if tag != CHUNK_KIND_ROOT_VALUE {
        return Err(VersioningError::Corrupt(format!("not a root value chunk (kind tag {tag})")));
    }
    let mut pos = 1usize;
    let table_count = read_varint(bytes, &mut pos)?;
    let mut tables = Vec::with_capacity(table_count as usize);
    for _ in 0..table_count {
        let name = read_string(bytes, &mut pos)?;
        let hash = read_hash(bytes, &mut pos)?;
        tables.push((name, hash));
    }
    let foreign_keys = read_bytes(bytes, &mut pos)?;
    let schemas_metadata = read_bytes(bytes, &mut pos)?;
    Ok(RootValue { tables, foreign_keys, schemas_metadata })
}
