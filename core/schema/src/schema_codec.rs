//! Bespoke binary encoding for [`Schema`] chunks. A schema carries no refs to other chunks
//! — column types are scalar, defaults/check expressions are opaque blobs, and foreign keys
//! name tables/columns rather than pointing at their chunks — so schema chunks are leaves in
//! the value graph and need no [`dolt_valuegraph::ChildExtractor`].

use crate::types::{
    CheckDescriptor, ColumnDescriptor, ColumnType, ForeignKeyDescriptor, IndexDescriptor, RefAction, Schema,
};
use crate::SchemaError;

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
        let byte = *buf.get(*pos).ok_or(SchemaError::Corrupt("truncated varint".to_string()))?;
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

fn read_string(buf: &[u8], pos: &mut usize) -> Result<String, SchemaError> {
    let len = read_varint(buf, pos)? as usize;
    let bytes = buf.get(*pos..*pos + len).ok_or(SchemaError::Corrupt("truncated string".to_string()))?;
    *pos += len;
    String::from_utf8(bytes.to_vec()).map_err(|_| SchemaError::Corrupt("invalid utf8".to_string()))
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn read_bytes(buf: &[u8], pos: &mut usize) -> Result<Vec<u8>, SchemaError> {
    let len = read_varint(buf, pos)? as usize;
    let bytes = buf.get(*pos..*pos + len).ok_or(SchemaError::Corrupt("truncated bytes".to_string()))?;
    *pos += len;
    Ok(bytes.to_vec())
}

fn write_column_type(out: &mut Vec<u8>, t: &ColumnType) {
    match t {
        ColumnType::Bool => out.push(0),
        ColumnType::Int8 => out.push(1),
        ColumnType::Int16 => out.push(2),
        ColumnType::Int32 => out.push(3),
        ColumnType::Int64 => out.push(4),
        ColumnType::Float32 => out.push(5),
        ColumnType::Float64 => out.push(6),
        ColumnType::Varchar(n) => {
            out.push(7);
            write_varint(out, *n as u64);
        }
        ColumnType::Decimal { precision, scale } => {
            out.push(8);
            out.push(*precision);
            out.push(*scale);
        }
        ColumnType::Blob => out.push(9),
    }
}

fn read_column_type(buf: &[u8], pos: &mut usize) -> Result<ColumnType, SchemaError> {
    let tag = *buf.get(*pos).ok_or(SchemaError::Corrupt("truncated column type".to_string()))?;
    *pos += 1;
    Ok(match tag {
        0 => ColumnType::Bool,
        1 => ColumnType::Int8,
        2 => ColumnType::Int16,
        3 => ColumnType::Int32,
        4 => ColumnType::Int64,
        5 => ColumnType::Float32,
        6 => ColumnType::Float64,
        7 => ColumnType::Varchar(read_varint(buf, pos)? as u32),
        8 => {
            let precision = *buf.get(*pos).ok_or(SchemaError::Corrupt("truncated decimal".to_string()))?;
            *pos += 1;
            let scale = *buf.get(*pos).ok_or(SchemaError::Corrupt("truncated decimal".to_string()))?;
            *pos += 1;
            ColumnType::Decimal { precision, scale }
        }
        9 => ColumnType::Blob,
        other => return Err(SchemaError::Corrupt(format!("unknown column type tag {other}"))),
    })
}

fn write_ref_action(out: &mut Vec<u8>, action: RefAction) {
    out.push(match action {
        RefAction::NoAction => 0,
        RefAction::Cascade => 1,
        RefAction::SetNull => 2,
        RefAction::Restrict => 3,
    });
}

fn read_ref_action(buf: &[u8], pos: &mut usize) -> Result<RefAction, SchemaError> {
    let tag = *buf.get(*pos).ok_or(SchemaError::Corrupt("truncated ref action".to_string()))?;
    *pos += 1;
    Ok(match tag {
        0 => RefAction::NoAction,
        1 => RefAction::Cascade,
        2 => RefAction::SetNull,
        3 => RefAction::Restrict,
        other => return Err(SchemaError::Corrupt(format!("unknown ref action tag {other}"))),
    })
}

pub fn encode_schema(schema: &Schema) -> Vec<u8> {
    let mut out = Vec::new();

    write_varint(&mut out, schema.columns.len() as u64);
    for col in &schema.columns {
        write_string(&mut out, &col.name);
        write_column_type(&mut out, &col.col_type);
        write_varint(&mut out, col.pk_position.map(|p| p as u64 + 1).unwrap_or(0));
        out.push(col.nullable as u8);
        match &col.default {
            Some(d) => {
                out.push(1);
                write_bytes(&mut out, d);
            }
            None => out.push(0),
        }
        out.push(col.auto_increment as u8);
    }

    write_varint(&mut out, schema.indexes.len() as u64);
    for idx in &schema.indexes {
        write_string(&mut out, &idx.name);
        out.push(idx.unique as u8);
        write_varint(&mut out, idx.columns.len() as u64);
        for c in &idx.columns {
            write_string(&mut out, c);
        }
    }

    write_varint(&mut out, schema.checks.len() as u64);
    for chk in &schema.checks {
        write_string(&mut out, &chk.name);
        write_bytes(&mut out, &chk.expression);
    }

    write_varint(&mut out, schema.foreign_keys.len() as u64);
    for fk in &schema.foreign_keys {
        write_string(&mut out, &fk.name);
        write_varint(&mut out, fk.columns.len() as u64);
        for c in &fk.columns {
            write_string(&mut out, c);
        }
        write_string(&mut out, &fk.ref_table);
        write_varint(&mut out, fk.ref_columns.len() as u64);
        for c in &fk.ref_columns {
            write_string(&mut out, c);
        }
        write_ref_action(&mut out, fk.on_delete);
        write_ref_action(&mut out, fk.on_update);
    }

    out
}

pub fn decode_schema(buf: &[u8]) -> Result<Schema, SchemaError> {
    let mut pos = 0usize;

    let col_count = read_varint(buf, &mut pos)?;
    let mut columns = Vec::with_capacity(col_count as usize);
    for _ in 0..col_count {
        let name = read_string(buf, &mut pos)?;
        let col_type = read_column_type(buf, &mut pos)?;
        let pk_raw = read_varint(buf, &mut pos)?;
        let pk_position = if pk_raw == 0 { None } else { Some((pk_raw - 1) as u32) };
        let nullable = *buf.get(pos).ok_or(SchemaError::Corrupt("truncated nullable".to_string()))? != 0;
        pos += 1;
        let has_default = *buf.get(pos).ok_or(SchemaError::Corrupt("truncated default flag".to_string()))? != 0;
        pos += 1;
        let default = if has_default { Some(read_bytes(buf, &mut pos)?) } else { None };
        let auto_increment = *buf.get(pos).ok_or(SchemaError::Corrupt("truncated auto_increment".to_string()))? != 0;
        pos += 1;
        columns.push(ColumnDescriptor { name, col_type, pk_position, nullable, default, auto_increment });
    }

    let index_count = read_varint(buf, &mut pos)?;
    let mut indexes = Vec::with_capacity(index_count as usize);
    for _ in 0..index_count {
        let name = read_string(buf, &mut pos)?;
        let unique = *buf.get(pos).ok_or(SchemaError::Corrupt("truncated unique".to_string()))? != 0;
        pos += 1;
        let col_count = read_varint(buf, &mut pos)?;
        let mut columns = Vec::with_capacity(col_count as usize);
        for _ in 0..col_count {
            columns.push(read_string(buf, &mut pos)?);
        }
        indexes.push(IndexDescriptor { name, columns, unique });
    }

    let check_count = read_varint(buf, &mut pos)?;
    let mut checks = Vec::with_capacity(check_count as usize);
    for _ in 0..check_count {
        let name = read_string(buf, &mut pos)?;
        let expression = read_bytes(buf, &mut pos)?;
        checks.push(CheckDescriptor { name, expression });
    }

    let fk_count = read_varint(buf, &mut pos)?;
    let mut foreign_keys = Vec::with_capacity(fk_count as usize);
    for _ in 0..fk_count {
        let name = read_string(buf, &mut pos)?;
        let col_count = read_varint(buf, &mut pos)?;
        let mut columns = Vec::with_capacity(col_count as usize);
        for _ in 0..col_count {
            columns.push(read_string(buf, &mut pos)?);
        }
        let ref_table = read_string(buf, &mut pos)?;
        let ref_col_count = read_varint(buf, &mut pos)?;
        let mut ref_columns = Vec::with_capacity(ref_col_count as usize);
        for _ in 0..ref_col_count {
            ref_columns.push(read_string(buf, &mut pos)?);
        }
        let on_delete = read_ref_action(buf, &mut pos)?;
        let on_update = read_ref_action(buf, &mut pos)?;
        foreign_keys.push(ForeignKeyDescriptor { name, columns, ref_table, ref_columns, on_delete, on_update });
    }

    Ok(Schema { columns, indexes, checks, foreign_keys })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_with_every_descriptor_kind_roundtrips() {
        let schema = Schema {
            columns: vec![
                ColumnDescriptor {
                    name: "id".to_string(),
                    col_type: ColumnType::Int32,
                    pk_position: Some(0),
                    nullable: false,
                    default: None,
                    auto_increment: true,
                },
                ColumnDescriptor {
                    name: "name".to_string(),
                    col_type: ColumnType::Varchar(255),
                    pk_position: None,
                    nullable: true,
                    default: Some(b"''".to_vec()),
                    auto_increment: false,
                },
            ],
            indexes: vec![IndexDescriptor { name: "idx_name".to_string(), columns: vec!["name".to_string()], unique: false }],
            checks: vec![CheckDescriptor { name: "chk_id".to_string(), expression: b"id > 0".to_vec() }],
            foreign_keys: vec![ForeignKeyDescriptor {
                name: "fk_parent".to_string(),
                columns: vec!["id".to_string()],
                ref_table: "parent".to_string(),
                ref_columns: vec!["id".to_string()],
                on_delete: RefAction::Cascade,
                on_update: RefAction::NoAction,
            }],
        };

        let encoded = encode_schema(&schema);
        let decoded = decode_schema(&encoded).unwrap();
        assert_eq!(decoded, schema);
    }

    #[test]
    fn empty_schema_roundtrips() {
        let schema = Schema::default();
        let decoded = decode_schema(&encode_schema(&schema)).unwrap();
        assert_eq!(decoded, schema);
    }
}
