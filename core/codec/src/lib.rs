//! Typed, self-describing value codec (spec.md §4.1 and §3).
//!
//! A [`Value`] is the in-memory representation of anything that can live in the dolt value
//! graph: booleans, arbitrary-precision decimals, strings, blobs, lists/sets/maps, structs,
//! refs, and type descriptors. [`encode::encode_value`]/[`decode::decode_value`] are exact
//! inverses of each other and produce the canonical byte form that gets hashed — two
//! correct implementations of this codec must produce identical bytes for the same logical
//! value (Testable Property 1 in spec.md §8).

pub mod chunk_kind;
pub mod decode;
pub mod encode;
pub mod ordering;
pub mod types;
mod varint;

pub use chunk_kind::{
    CHUNK_KIND_COMMIT, CHUNK_KIND_PROLLY_INTERNAL, CHUNK_KIND_PROLLY_LEAF, CHUNK_KIND_ROOT_VALUE, CHUNK_KIND_TABLE,
};
pub use decode::{decode_struct, decode_value};
pub use encode::{encode_value, hash_value};
pub use ordering::compare_values;
pub use types::{
    Number, PrimitiveKind, RefValue, StructField, StructType, StructValue, TargetType, TypeDesc,
    Value,
};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("buffer ended before a complete value was read")]
    Truncated,
    #[error("unknown value kind tag {0}")]
    UnknownKind(u8),
    #[error("malformed encoding: {0}")]
    Malformed(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn struct_type() -> StructType {
        StructType {
            name: "Point".to_string(),
            fields: vec![
                StructField { name: "x".to_string(), field_type: TypeDesc::Number, optional: false },
                StructField { name: "y".to_string(), field_type: TypeDesc::Number, optional: false },
            ],
        }
    }

    #[test]
    fn roundtrip_primitives() {
        for v in [
            Value::Bool(true),
            Value::Bool(false),
            Value::Number(Number::from_i64(-42)),
            Value::String("hello, dolt".to_string()),
            Value::Blob(vec![1, 2, 3, 4]),
        ] {
            let encoded = encode_value(&v);
            let (decoded, len) = decode_value(&encoded).unwrap();
            assert_eq!(len, encoded.len());
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn roundtrip_list_and_map() {
        let list = Value::List(vec![Value::Number(Number::from_i64(1)), Value::Number(Number::from_i64(2))]);
        let encoded = encode_value(&list);
        let (decoded, _) = decode_value(&encoded).unwrap();
        assert_eq!(decoded, list);

        let map = Value::Map(vec![(
            Value::String("k".to_string()),
            Value::Number(Number::from_i64(7)),
        )]);
        let encoded = encode_value(&map);
        let (decoded, _) = decode_value(&encoded).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn roundtrip_struct_requires_schema() {
        let st = struct_type();
        let sv = StructValue {
            type_: st.clone(),
            values: vec![Value::Number(Number::from_i64(1)), Value::Number(Number::from_i64(2))],
        };
        let value = Value::Struct(sv.clone());
        let encoded = encode_value(&value);
        // Generic decode refuses: it doesn't know the field count without the schema.
        assert!(decode_value(&encoded).is_err());
        let (decoded, len) = decode_struct(&encoded, &st).unwrap();
        assert_eq!(len, encoded.len());
        assert_eq!(decoded, sv);
    }

    #[test]
    fn deterministic_hash_across_encodes() {
        let v = Value::List(vec![Value::Bool(true), Value::String("x".into())]);
        assert_eq!(hash_value(&v), hash_value(&v.clone()));
    }

    #[test]
    fn roundtrip_ref_with_hashed_target() {
        let target_hash = dolt_hash::Hash::of_bytes(b"target chunk");
        let r = RefValue {
            target_type: TargetType::Hashed(dolt_hash::Hash::of_bytes(b"struct type")),
            target_hash,
            height: 3,
            item_count: 128,
        };
        let v = Value::Ref(r.clone());
        let encoded = encode_value(&v);
        let (decoded, len) = decode_value(&encoded).unwrap();
        assert_eq!(len, encoded.len());
        assert_eq!(decoded, v);
        if let Value::Ref(decoded_ref) = decoded {
            assert_eq!(decoded_ref.height, r.height);
        } else {
            panic!("expected ref");
        }
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_arbitrary_numbers(unscaled: i64, exponent: i8) {
            let v = Value::Number(Number::from_parts(unscaled as i128, exponent));
            let encoded = encode_value(&v);
            let (decoded, len) = decode_value(&encoded).unwrap();
            proptest::prop_assert_eq!(len, encoded.len());
            proptest::prop_assert_eq!(decoded, v);
        }

        #[test]
        fn roundtrip_arbitrary_strings(s: String) {
            let v = Value::String(s);
            let encoded = encode_value(&v);
            let (decoded, _) = decode_value(&encoded).unwrap();
            proptest::prop_assert_eq!(decoded, v);
        }
    }
}
