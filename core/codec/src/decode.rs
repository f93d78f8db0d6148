use dolt_hash::{Hash, HASH_LEN};

use crate::encode::{
    KIND_BLOB, KIND_BOOL, KIND_LIST, KIND_MAP, KIND_NUMBER, KIND_REF, KIND_SET, KIND_STRING,
    KIND_STRUCT, KIND_TYPE,
};
use crate::types::{
    Number, PrimitiveKind, RefValue, StructField, StructType, StructValue, TargetType, TypeDesc,
    Value,
};
use crate::varint;
use crate::CodecError;

/// Decodes a single value from the front of `buf`. Returns the value and the number of
/// bytes consumed; callers that expect to consume the whole buffer should assert the
/// returned length equals `buf.len()`.
pub fn decode_value(buf: &[u8]) -> Result<(Value, usize), CodecError> {
    let kind = *buf.first().ok_or(CodecError::Truncated)?;
    let mut pos = 1;
    let value = match kind {
        KIND_BOOL => {
            let b = *buf.get(pos).ok_or(CodecError::Truncated)?;
            pos += 1;
            Value::Bool(b != 0)
        }
        KIND_NUMBER => {
            let (len, n) = varint::read(&buf[pos..])?;
            pos += n;
            let len = len as usize;
            let unscaled = buf.get(pos..pos + len).ok_or(CodecError::Truncated)?.to_vec();
            pos += len;
            let exponent = *buf.get(pos).ok_or(CodecError::Truncated)? as i8;
            pos += 1;
            Value::Number(Number::from_raw(unscaled, exponent))
        }
        KIND_STRING => {
            let (len, n) = varint::read(&buf[pos..])?;
            pos += n;
            let len = len as usize;
            let bytes = buf.get(pos..pos + len).ok_or(CodecError::Truncated)?;
            pos += len;
            let s = std::str::from_utf8(bytes).map_err(|_| CodecError::Malformed("invalid utf8"))?;
            Value::String(s.to_string())
        }
        KIND_BLOB => {
            let (len, n) = varint::read(&buf[pos..])?;
            pos += n;
            let len = len as usize;
            let bytes = buf.get(pos..pos + len).ok_or(CodecError::Truncated)?.to_vec();
            pos += len;
            Value::Blob(bytes)
        }
        KIND_LIST | KIND_SET => {
            let (count, n) = varint::read(&buf[pos..])?;
            pos += n;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (item, n) = decode_value(&buf[pos..])?;
                pos += n;
                items.push(item);
            }
            if kind == KIND_LIST {
                Value::List(items)
            } else {
                Value::Set(items)
            }
        }
        KIND_MAP => {
            let (count, n) = varint::read(&buf[pos..])?;
            pos += n;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (k, n) = decode_value(&buf[pos..])?;
                pos += n;
                let (v, n) = decode_value(&buf[pos..])?;
                pos += n;
                entries.push((k, v));
            }
            Value::Map(entries)
        }
        KIND_STRUCT => {
            return Err(CodecError::Malformed(
                "decoding a bare struct requires its StructType; use decode_struct",
            ));
        }
        KIND_REF => {
            let (target_type, n) = read_target_type(&buf[pos..])?;
            pos += n;
            let hash_bytes = buf.get(pos..pos + HASH_LEN).ok_or(CodecError::Truncated)?;
            let mut arr = [0u8; HASH_LEN];
            arr.copy_from_slice(hash_bytes);
            let target_hash = Hash::from_bytes(arr);
            pos += HASH_LEN;
            let (height, n) = varint::read(&buf[pos..])?;
            pos += n;
            let (item_count, n) = varint::read(&buf[pos..])?;
            pos += n;
            Value::Ref(RefValue { target_type, target_hash, height, item_count })
        }
        KIND_TYPE => {
            let (t, n) = read_type_desc(&buf[pos..])?;
            pos += n;
            Value::Type(t)
        }
        other => return Err(CodecError::UnknownKind(other)),
    };
    Ok((value, pos))
}

/// Decodes a struct whose `StructType` (and therefore field count/order) is already known
/// from the surrounding schema. The encoded form only carries the field-name-list hash as
/// a sanity check, not the field names themselves (spec.md §4.1).
pub fn decode_struct(buf: &[u8], type_: &StructType) -> Result<(StructValue, usize), CodecError> {
    let kind = *buf.first().ok_or(CodecError::Truncated)?;
    if kind != KIND_STRUCT {
        return Err(CodecError::UnknownKind(kind));
    }
    let mut pos = 1;
    let hash_bytes = buf.get(pos..pos + HASH_LEN).ok_or(CodecError::Truncated)?;
    let mut arr = [0u8; HASH_LEN];
    arr.copy_from_slice(hash_bytes);
    let found_hash = Hash::from_bytes(arr);
    pos += HASH_LEN;
    if found_hash != type_.field_name_hash() {
        return Err(CodecError::Malformed("struct field-name hash does not match schema"));
    }
    let mut values = Vec::with_capacity(type_.fields.len());
    for _ in &type_.fields {
        let (v, n) = decode_value(&buf[pos..])?;
        pos += n;
        values.push(v);
    }
    Ok((StructValue { type_: type_.clone(), values }, pos))
}

fn read_target_type(buf: &[u8]) -> Result<(TargetType, usize), CodecError> {
    let tag = *buf.first().ok_or(CodecError::Truncated)?;
    match tag {
        KIND_BOOL => Ok((TargetType::Primitive(PrimitiveKind::Bool), 1)),
        KIND_NUMBER => Ok((TargetType::Primitive(PrimitiveKind::Number), 1)),
        KIND_STRING => Ok((TargetType::Primitive(PrimitiveKind::String), 1)),
        KIND_BLOB => Ok((TargetType::Primitive(PrimitiveKind::Blob), 1)),
        0xff => {
            let hash_bytes = buf.get(1..1 + HASH_LEN).ok_or(CodecError::Truncated)?;
            let mut arr = [0u8; HASH_LEN];
            arr.copy_from_slice(hash_bytes);
            Ok((TargetType::Hashed(Hash::from_bytes(arr)), 1 + HASH_LEN))
        }
        other => Err(CodecError::UnknownKind(other)),
    }
}

fn read_type_desc(buf: &[u8]) -> Result<(TypeDesc, usize), CodecError> {
    let kind = *buf.first().ok_or(CodecError::Truncated)?;
    let mut pos = 1;
    let t = match kind {
        KIND_BOOL => TypeDesc::Bool,
        KIND_NUMBER => TypeDesc::Number,
        KIND_STRING => TypeDesc::String,
        KIND_BLOB => TypeDesc::Blob,
        KIND_LIST => {
            let (elem, n) = read_type_desc(&buf[pos..])?;
            pos += n;
            TypeDesc::List(Box::new(elem))
        }
        KIND_SET => {
            let (elem, n) = read_type_desc(&buf[pos..])?;
            pos += n;
            TypeDesc::Set(Box::new(elem))
        }
        KIND_MAP => {
            let (k, n) = read_type_desc(&buf[pos..])?;
            pos += n;
            let (v, n) = read_type_desc(&buf[pos..])?;
            pos += n;
            TypeDesc::Map(Box::new(k), Box::new(v))
        }
        KIND_REF => {
            let (elem, n) = read_type_desc(&buf[pos..])?;
            pos += n;
            TypeDesc::Ref(Box::new(elem))
        }
        KIND_STRUCT => {
            let (st, n) = read_struct_type(&buf[pos..])?;
            pos += n;
            TypeDesc::Struct(st)
        }
        KIND_TYPE => TypeDesc::Type,
        other => return Err(CodecError::UnknownKind(other)),
    };
    Ok((t, pos))
}

fn read_struct_type(buf: &[u8]) -> Result<(StructType, usize), CodecError> {
    let mut pos = 0;
    let (name_len, n) = varint::read(&buf[pos..])?;
    pos += n;
    let name_bytes = buf.get(pos..pos + name_len as usize).ok_or(CodecError::Truncated)?;
    let name = std::str::from_utf8(name_bytes).map_err(|_| CodecError::Malformed("invalid utf8"))?.to_string();
    pos += name_len as usize;
    let (field_count, n) = varint::read(&buf[pos..])?;
    pos += n;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let (fname_len, n) = varint::read(&buf[pos..])?;
        pos += n;
        let fname_bytes = buf.get(pos..pos + fname_len as usize).ok_or(CodecError::Truncated)?;
        let fname =
            std::str::from_utf8(fname_bytes).map_err(|_| CodecError::Malformed("invalid utf8"))?.to_string();
        pos += fname_len as usize;
        let (field_type, n) = read_type_desc(&buf[pos..])?;
        pos += n;
        let optional = *buf.get(pos).ok_or(CodecError::Truncated)? != 0;
        pos += 1;
        fields.push(StructField { name: fname, field_type, optional });
    }
    Ok((StructType { name, fields }, pos))
}
