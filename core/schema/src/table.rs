//! Table chunk encoding (spec.md §4.5): "a table is a schema ref, a row-data ref, a map of
//! index-name to index-data ref, an auto-increment counter, and refs to conflict/constraint-
//! violation data." Table chunks are, like prolly [`dolt_prolly::Node`]s, bespoke binary
//! encodings rather than generic [`dolt_codec::Value::Struct`]s: the generic codec cannot
//! decode a bare struct without an externally supplied `StructType`, and a table has no
//! natural schema of its own to hand it (it *is* schema-adjacent metadata).

use dolt_codec::{encode_value, Number, CHUNK_KIND_TABLE};
use dolt_hash::{Hash, HASH_LEN};
use dolt_prolly::ChildRef;
use dolt_valuegraph::ChildExtractor;

use crate::SchemaError;

const TAG_REF_PRESENT: u8 = 1;
const TAG_REF_ABSENT: u8 = 0;

/// One SQL table's storage, as it sits in a `RootValue` (spec.md §3/§4.5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub schema: Hash,
    pub rows: Option<ChildRef>,
    /// Index name to its row-data prolly tree, in a stable (sorted by name) order so two
    /// tables with the same indexes hash equal regardless of creation order.
    pub indexes: Vec<(String, Option<ChildRef>)>,
    pub autoinc: Number,
    /// The `dolt_constraint_violations_<tbl>` system table's backing data (spec.md §7).
    pub constraint_violations: Option<ChildRef>,
    /// The `dolt_conflicts_<tbl>` system table's backing data, populated by a merge that
    /// leaves unresolved row conflicts (spec.md §4.6/§7).
    pub conflicts: Option<ChildRef>,
}

impl Table {
    pub fn index(&self, name: &str) -> Option<&Option<ChildRef>> {
        self.indexes.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}

pub struct TableChildExtractor;

impl ChildExtractor for TableChildExtractor {
    fn children(&self, _hash: Hash, bytes: &[u8]) -> Result<Vec<Hash>, dolt_valuegraph::ValueGraphError> {
        let table = decode_table(bytes).map_err(|e| dolt_valuegraph::ValueGraphError::Corrupt(e.to_string()))?;
        let mut out = Vec::new();
        if !table.schema.is_empty() {
            out.push(table.schema);
        }
        if let Some(r) = &table.rows {
            out.push(r.hash);
        }
        for (_, r) in &table.indexes {
            if let Some(r) = r {
                out.push(r.hash);
            }
        }
        if let Some(r) = &table.constraint_violations {
            out.push(r.hash);
        }
        if let Some(r) = &table.conflicts {
            out.push(r.hash);
        }
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

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, SchemaError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*pos).ok_or_else(|| SchemaError::Corrupt("truncated varint".to_string()))?;
        *pos += 1;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn write_hash(out: &mut Vec<u8>, hash: &Hash) {
    out.extend_from_slice(hash.as_bytes());
}

fn read_hash(buf: &[u8], pos: &mut usize) -> Result<Hash, SchemaError> {
    let bytes = buf.get(*pos..*pos + HASH_LEN).ok_or_else(|| SchemaError::Corrupt("truncated hash".to_string()))?;
    let mut arr = [0u8; HASH_LEN];
    arr.copy_from_slice(bytes);
    *pos += HASH_LEN;
    Ok(Hash::from_bytes(arr))
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    write_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn read_string(buf: &[u8], pos: &mut usize) -> Result<String, SchemaError> {
    let len = read_varint(buf, pos)? as usize;
    let bytes = buf.get(*pos..*pos + len).ok_or_else(|| SchemaError::Corrupt("truncated string".to_string()))?;
    *pos += len;
    String::from_utf8(bytes.to_vec()).map_err(|_| SchemaError::Corrupt("invalid utf8".to_string()))
}

fn write_child_ref(out: &mut Vec<u8>, child: &Option<ChildRef>) {
    match child {
        None => out.push(TAG_REF_ABSENT),
        Some(c) => {
            out.push(TAG_REF_PRESENT);
            write_hash(out, &c.hash);
            write_varint(out, c.height);
            write_varint(out, c.count);
        }
    }
}

fn read_child_ref(buf: &[u8], pos: &mut usize) -> Result<Option<ChildRef>, SchemaError> {
    let tag = *buf.get(*pos).ok_or_else(|| SchemaError::Corrupt("truncated child ref tag".to_string()))?;
    *pos += 1;
    match tag {
        TAG_REF_ABSENT => Ok(None),
        TAG_REF_PRESENT => {
            let hash = read_hash(buf, pos)?;
            let height = read_varint(buf, pos)?;
            let count = read_varint(buf, pos)?;
            Ok(Some(ChildRef { hash, height, count }))
        }
        other => Err(SchemaError::Corrupt(format!("unknown child ref tag {other}"))),
    }
}

pub fn encode_table(table: &Table) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(CHUNK_KIND_TABLE);
    write_hash(&mut out, &table.schema);
    write_child_ref(&mut out, &table.rows);

    write_varint(&mut out, table.indexes.len() as u64);
    for (name, child) in &table.indexes {
        write_string(&mut out, name);
        write_child_ref(&mut out, child);
    }

    let encoded_autoinc = encode_value(&dolt_codec::Value::Number(table.autoinc.clone()));
    write_varint(&mut out, encoded_autoinc.len() as u64);
    out.extend_from_slice(&encoded_autoinc);

    write_child_ref(&mut out, &table.constraint_violations);
    write_child_ref(&mut out, &table.conflicts);
    out
}

pub fn decode_table(bytes: &[u8]) -> Result<Table, SchemaError> {
    let tag = *bytes.first().ok_or_else(|| SchemaError::Corrupt("empty table chunk".to_string()))?;
    if tag != CHUNK_KIND_TABLE {
        return Err(SchemaError::Corrupt(format!("not a table chunk (kind tag {tag})")));
    }
    let mut pos = 1usize;
    let schema = read_hash(bytes, &mut pos)?;
    let rows = read_child_ref(bytes, &mut pos)?;

    let index_count = read_varint(bytes, &mut pos)?;
    let mut indexes = Vec::with_capacity(index_count as usize);
    for _ in 0..index_count {
        let name = read_string(bytes, &mut pos)?;
        let child = read_child_ref(bytes, &mut pos)?;
        indexes.push((name, child));
    }

    let autoinc_len = read_varint(bytes, &mut pos)? as usize;
    let slice = bytes.get(pos..pos + autoinc_len).ok_or_else(|| SchemaError::Corrupt("truncated autoinc".to_string()))?;
    let (autoinc_value, consumed) =
        dolt_codec::decode_value(slice).map_err(|e| SchemaError::Corrupt(format!("autoinc: {e}")))?;
    debug_assert_eq!(consumed, slice.len());
    pos += autoinc_len;
    let autoinc = match autoinc_value {
        dolt_codec::Value::Number(n) => n,
        _ => return Err(SchemaError::Corrupt("autoinc is not a number".to_string())),
    };

    let constraint_violations = read_child_ref(bytes, &mut pos)?;
    let conflicts = read_child_ref(bytes, &mut pos)?;

    Ok(Table { schema, rows, indexes, autoinc, constraint_violations, conflicts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table {
            schema: Hash::of_bytes(b"schema chunk"),
            rows: Some(ChildRef { hash: Hash::of_bytes(b"rows"), height: 1, count: 42 }),
            indexes: vec![
                ("idx_email".to_string(), Some(ChildRef { hash: Hash::of_bytes(b"idx"), height: 0, count: 10 })),
                ("idx_empty".to_string(), None),
            ],
            autoinc: Number::from_i64(7),
            constraint_violations: None,
            conflicts: Some(ChildRef { hash: Hash::of_bytes(b"conflicts"), height: 0, count: 2 }),
        }
    }

    #[test]
    fn table_roundtrips() {
        let table = sample_table();
        let encoded = encode_table(&table);
        let decoded = decode_table(&encoded).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn child_extractor_surfaces_every_present_ref() {
        let table = sample_table();
        let encoded = encode_table(&table);
        let children = TableChildExtractor.children(Hash::of_bytes(b"self"), &encoded).unwrap();
        assert!(children.contains(&table.schema));
        assert!(children.contains(&table.rows.as_ref().unwrap().hash));
        assert!(children.contains(&Hash::of_bytes(b"idx")));
        assert!(children.contains(&table.conflicts.as_ref().unwrap().hash));
        // constraint_violations is None and idx_empty is None, so neither contributes.
        assert_eq!(children.len(), 4);
    }

    #[test]
    fn table_with_no_indexes_or_system_tables_roundtrips() {
        let table = Table {
            schema: Hash::of_bytes(b"schema"),
            rows: None,
            indexes: vec![],
            autoinc: Number::from_i64(1),
            constraint_violations: None,
            conflicts: None,
        };
        let decoded = decode_table(&encode_table(&table)).unwrap();
        assert_eq!(decoded, table);
    }
}
