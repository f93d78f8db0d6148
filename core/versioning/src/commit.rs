//! Commit chunk encoding (spec.md §3/§4.5): "a commit is a struct {parents: list<ref<Commit>>,
//! meta: struct, value: ref<RootValue>}." Like [`crate::root_value::RootValue`], commits are
//! bespoke binary encodings rather than generic `Value::Struct`s, for the same reason tables
//! are (no externally-known `StructType` to decode against).

use dolt_codec::CHUNK_KIND_COMMIT;
use dolt_hash::{Hash, HASH_LEN};
use dolt_valuegraph::ChildExtractor;

use crate::VersioningError;

/// Commit authorship and free-form metadata. `extra` supplements name/email/timestamp/
/// description with arbitrary (key, value) string pairs (SPEC_FULL.md §3: "Dolt's
/// `NewCommitMeta` supports custom fields beyond name/email/timestamp/description").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitMeta {
    pub name: String,
    pub email: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub description: String,
    pub extra: Vec<(String, String)>,
}

/// spec.md §3: "Parent list order matters: parent[0] is the 'first parent'."
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub parents: Vec<Hash>,
    pub value: Hash,
    pub meta: CommitMeta,
}

pub struct CommitChildExtractor;

impl ChildExtractor for CommitChildExtractor {
    fn children(&self, _hash: Hash, bytes: &[u8]) -> Result<Vec<Hash>, dolt_valuegraph::ValueGraphError> {
        let commit = decode_commit(bytes).map_err(|e| dolt_valuegraph::ValueGraphError::Corrupt(e.to_string()))?;
        let mut out = commit.parents;
        out.push(commit.value);
        Ok(out)
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

fn write_zigzag(out: &mut Vec<u8>, value: i64) {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    write_varint(out, zigzag);
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

fn read_zigzag(buf: &[u8], pos: &mut usize) -> Result<i64, VersioningError> {
    let zigzag = read_varint(buf, pos)?;
    Ok(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64))
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

pub fn encode_commit(commit: &Commit) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(CHUNK_KIND_COMMIT);
    write_varint(&mut out, commit.parents.len() as u64);
    for p in &commit.parents {
        write_hash(&mut out, p);
    }
    write_hash(&mut out, &commit.value);

    write_string(&mut out, &commit.meta.name);
    write_string(&mut out, &commit.meta.email);
    write_zigzag(&mut out, commit.meta.timestamp);
    write_string(&mut out, &commit.meta.description);
    write_varint(&mut out, commit.meta.extra.len() as u64);
    for (k, v) in &commit.meta.extra {
        write_string(&mut out, k);
        write_string(&mut out, v);
    }
    out
}

pub fn decode_commit(bytes: &[u8]) -> Result<Commit, VersioningError> {
    let tag = *bytes.first().ok_or_else(|| VersioningError::Corrupt("empty commit chunk".to_string()))?;
    if tag != CHUNK_KIND_COMMIT {
        return Err(VersioningError::Corrupt(format!("not a commit chunk (kind tag {tag})")));
    }
    let mut pos = 1usize;
    let parent_count = read_varint(bytes, &mut pos)?;
    let mut parents = Vec::with_capacity(parent_count as usize);
    for _ in 0..parent_count {
        parents.push(read_hash(bytes, &mut pos)?);
    }
    let value = read_hash(bytes, &mut pos)?;

    let name = read_string(bytes, &mut pos)?;
    let email = read_string(bytes, &mut pos)?;
    let timestamp = read_zigzag(bytes, &mut pos)?;
    let description = read_string(bytes, &mut pos)?;
    let extra_count = read_varint(bytes, &mut pos)?;
    let mut extra = Vec::with_capacity(extra_count as usize);
    for _ in 0..extra_count {
        let k = read_string(bytes, &mut pos)?;
        let v = read_string(bytes, &mut pos)?;
        extra.push((k, v));
    }

    Ok(Commit { parents, value, meta: CommitMeta { name, email, timestamp, description, extra } })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Commit {
        Commit {
            parents: vec![Hash::of_bytes(b"parent1"), Hash::of_bytes(b"parent2")],
            value: Hash::of_bytes(b"root"),
            meta: CommitMeta {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                timestamp: -1234,
                description: "initial commit".to_string(),
                extra: vec![("signed-off-by".to_string(), "grace".to_string())],
            },
        }
    }

    #[test]
    fn commit_roundtrips() {
        let commit = sample();
        let decoded = decode_commit(&encode_commit(&commit)).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn root_commit_has_no_parents() {
        let commit = Commit { parents: vec![], ..sample() };
        let decoded = decode_commit(&encode_commit(&commit)).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn child_extractor_yields_parents_and_value() {
        let commit = sample();
        let children = CommitChildExtractor.children(Hash::of_bytes(b"self"), &encode_commit(&commit)).unwrap();
        assert_eq!(children, vec![commit.parents[0], commit.parents[1], commit.value]);
    }
}
