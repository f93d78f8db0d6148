use dolt_hash::Hash;

use crate::types::{PrimitiveKind, StructType, TargetType, TypeDesc, Value};
use crate::varint;

pub const KIND_BOOL: u8 = 0;
pub const KIND_NUMBER: u8 = 1;
pub const KIND_STRING: u8 = 2;
pub const KIND_BLOB: u8 = 3;
pub const KIND_LIST: u8 = 4;
pub const KIND_SET: u8 = 5;
pub const KIND_MAP: u8 = 6;
pub const KIND_STRUCT: u8 = 7;
pub const KIND_REF: u8 = 8;
pub const KIND_TYPE: u8 = 9;

/// Encodes `value` into its canonical chunk-payload byte form: `[kind:1][payload:*]`
/// (spec.md §6). This is the exact form that gets hashed, so it must never depend on
/// anything but `value` itself.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Bool(b) => {
            out.push(KIND_BOOL);
            out.push(*b as u8);
        }
        Value::Number(n) => {
            out.push(KIND_NUMBER);
            varint::write(out, n.raw_unscaled().len() as u64);
            out.extend_from_slice(n.raw_unscaled());
            out.push(n.exponent as u8);
        }
        Value::String(s) => {
            out.push(KIND_STRING);
            varint::write(out, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Blob(b) => {
            out.push(KIND_BLOB);
            varint::write(out, b.len() as u64);
            out.extend_from_slice(b);
        }
        Value::List(items) => {
            out.push(KIND_LIST);
            varint::write(out, items.len() as u64);
            for item in items {
                write_value(out, item);
            }
        }
        Value::Set(items) => {
            out.push(KIND_SET);
            varint::write(out, items.len() as u64);
            for item in items {
                write_value(out, item);
            }
        }
        Value::Map(entries) => {
            out.push(KIND_MAP);
            varint::write(out, entries.len() as u64);
            for (k, v) in entries {
                write_value(out, k);
                write_value(out, v);
            }
        }
        Value::Struct(s) => {
            out.push(KIND_STRUCT);
            out.extend_from_slice(s.type_.field_name_hash().as_bytes());
            for v in &s.values {
                write_value(out, v);
            }
        }
        Value::Ref(r) => {
            out.push(KIND_REF);
            write_target_type(out, &r.target_type);
            out.extend_from_slice(r.target_hash.as_bytes());
            varint::write(out, r.height);
            varint::write(out, r.item_count);
        }
        Value::Type(t) => {
            out.push(KIND_TYPE);
            write_type_desc(out, t);
        }
    }
}

fn write_target_type(out: &mut Vec<u8>, target: &TargetType) {
    match target {
        TargetType::Primitive(PrimitiveKind::Bool) => out.push(KIND_BOOL),
        TargetType::Primitive(PrimitiveKind::Number) => out.push(KIND_NUMBER),
        TargetType::Primitive(PrimitiveKind::String) => out.push(KIND_STRING),
        TargetType::Primitive(PrimitiveKind::Blob) => out.push(KIND_BLOB),
        TargetType::Hashed(h) => {
            out.push(0xff); // sentinel: a type-value hash follows, not an inline kind
            out.extend_from_slice(h.as_bytes());
        }
    }
}

fn write_type_desc(out: &mut Vec<u8>, t: &TypeDesc) {
    match t {
        TypeDesc::Bool => out.push(KIND_BOOL),
        TypeDesc::Number => out.push(KIND_NUMBER),
        TypeDesc::String => out.push(KIND_STRING),
        TypeDesc::Blob => out.push(KIND_BLOB),
        TypeDesc::List(elem) => {
            out.push(KIND_LIST);
            write_type_desc(out, elem);
        }
        TypeDesc::Set(elem) => {
            out.push(KIND_SET);
            write_type_desc(out, elem);
        }
        TypeDesc::Map(k, v) => {
            out.push(KIND_MAP);
            write_type_desc(out, k);
            write_type_desc(out, v);
        }
        TypeDesc::Ref(elem) => {
            out.push(KIND_REF);
            write_type_desc(out, elem);
        }
        TypeDesc::Struct(st) => {
            out.push(KIND_STRUCT);
            write_struct_type(out, st);
        }
        TypeDesc::Type => out.push(KIND_TYPE),
    }
}

fn write_struct_type(out: &mut Vec<u8>, st: &StructType) {
    varint::write(out, st.name.len() as u64);
    out.extend_from_slice(st.name.as_bytes());
    varint::write(out, st.fields.len() as u64);
    for field in &st.fields {
        varint::write(out, field.name.len() as u64);
        out.extend_from_slice(field.name.as_bytes());
        write_type_desc(out, &field.field_type);
        out.push(field.optional as u8);
    }
}

/// Hash of a value's canonical encoding. This is the chunk hash that would be assigned if
/// the value were written to a chunk store (spec.md §3 invariant: `hash(v)` fixes the full
/// semantic content of `v`).
pub fn hash_value(value: &Value) -> Hash {
    Hash::of_bytes(&encode_value(value))
}
