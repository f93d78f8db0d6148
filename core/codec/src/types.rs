use dolt_hash::Hash;

/// A decimal number: an arbitrary-precision unscaled integer plus a signed exponent, so
/// that `value == unscaled * 10^exponent`. Stored as a minimal big-endian two's-complement
/// byte string rather than a machine int so precision is unbounded, matching spec.md §3's
/// "Number (decimal with precision+scale)".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Number {
    pub(crate) unscaled: Vec<u8>,
    pub exponent: i8,
}

impl Number {
    pub fn from_i64(value: i64) -> Number {
        Number { unscaled: minimal_twos_complement(value as i128), exponent: 0 }
    }

    pub fn from_parts(unscaled: i128, exponent: i8) -> Number {
        Number { unscaled: minimal_twos_complement(unscaled), exponent }
    }

    pub fn unscaled_i128(&self) -> i128 {
        let mut bytes = [0u8; 16];
        let fill = if is_negative(&self.unscaled) { 0xffu8 } else { 0x00 };
        for b in bytes.iter_mut() {
            *b = fill;
        }
        let start = 16 - self.unscaled.len();
        bytes[start..].copy_from_slice(&self.unscaled);
        i128::from_be_bytes(bytes)
    }

    pub fn raw_unscaled(&self) -> &[u8] {
        &self.unscaled
    }

    pub fn from_raw(unscaled: Vec<u8>, exponent: i8) -> Number {
        Number { unscaled, exponent }
    }

    /// Natural numeric ordering, not byte ordering: two decimals with different exponents
    /// but equal value compare equal (spec.md §4.3: "keys are compared by the value-order
    /// for their declared type (numeric natural order)").
    pub fn cmp_numeric(&self, other: &Number) -> std::cmp::Ordering {
        // Bring both to the smaller exponent to compare as integers without floating
        // point. Unscaled values in this codec are bounded by i128, so this is exact for
        // every value this implementation can construct.
        let min_exp = self.exponent.min(other.exponent) as i32;
        let a = self.unscaled_i128() as i128 * pow10(self.exponent as i32 - min_exp);
        let b = other.unscaled_i128() as i128 * pow10(other.exponent as i32 - min_exp);
        a.cmp(&b)
    }
}

fn pow10(exp: i32) -> i128 {
    let mut result: i128 = 1;
    for _ in 0..exp {
        result *= 10;
    }
    result
}

fn is_negative(bytes: &[u8]) -> bool {
    bytes.first().is_some_and(|b| b & 0x80 != 0)
}

fn minimal_twos_complement(value: i128) -> Vec<u8> {
    if value == 0 {
        return vec![0];
    }
    let full = value.to_be_bytes();
    let fill = if value < 0 { 0xffu8 } else { 0x00 };
    let mut start = 0;
    while start < full.len() - 1 {
        let next_fill_matches = full[start] == fill;
        let sign_bit_consistent = (full[start + 1] & 0x80 != 0) == (fill == 0xff);
        if next_fill_matches && sign_bit_consistent {
            start += 1;
        } else {
            break;
        }
    }
    full[start..].to_vec()
}

/// Primitive kinds that can appear inline in a [`super::types::TargetType::Primitive`]
/// without a separate type-value chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    Number,
    String,
    Blob,
}

/// A type descriptor: the structure of another value. Two struct values are the "same
/// type" iff their descriptors hash equal (spec.md §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDesc {
    Bool,
    Number,
    String,
    Blob,
    List(Box<TypeDesc>),
    Set(Box<TypeDesc>),
    Map(Box<TypeDesc>, Box<TypeDesc>),
    Ref(Box<TypeDesc>),
    Struct(StructType),
    /// The type of a type descriptor value itself.
    Type,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub field_type: TypeDesc,
    pub optional: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<StructField>,
}

impl StructType {
    /// Hash of the ordered field-name list, used as the "field-name list hash" component
    /// of struct encoding (spec.md §4.1).
    pub fn field_name_hash(&self) -> Hash {
        let mut buf = Vec::new();
        for field in &self.fields {
            crate::varint::write(&mut buf, field.name.len() as u64);
            buf.extend_from_slice(field.name.as_bytes());
        }
        Hash::of_bytes(&buf)
    }
}

/// Either the target's type is one of the four primitives and is inlined, or it's a
/// struct/collection type and only its content hash is carried (spec.md §4.1: "Refs:
/// target-type-ref hash (or inline type for primitives)").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetType {
    Primitive(PrimitiveKind),
    Hashed(Hash),
}

/// A typed pointer to another chunk: spec.md §3's `Ref<T>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefValue {
    pub target_type: TargetType,
    pub target_hash: Hash,
    /// Distance in edges from this ref to the deepest reachable leaf.
    pub height: u64,
    /// Total item count of the subtree the ref points at; lets `Len()` on a prolly tree
    /// be O(1) (spec.md §4.3).
    pub item_count: u64,
}

impl RefValue {
    /// Ref ordering tie-break from spec.md §4.3: "(target height desc, hash asc)".
    pub fn cmp_ref_order(&self, other: &RefValue) -> std::cmp::Ordering {
        other.height.cmp(&self.height).then_with(|| self.target_hash.cmp(&other.target_hash))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructValue {
    pub type_: StructType,
    /// Values in declared field order, matching `type_.fields`.
    pub values: Vec<Value>,
}

/// A typed value, per spec.md §3.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Number(Number),
    String(String),
    Blob(Vec<u8>),
    List(Vec<Value>),
    /// Logically a set; construction helpers keep it sorted and deduplicated by the
    /// value-order in `ordering::compare_values` (spec.md §4.3's "maps/sets are sorted by
    /// key hash order within leaves but by key order at the logical level").
    Set(Vec<Value>),
    /// Logically a map; construction helpers keep it sorted by key.
    Map(Vec<(Value, Value)>),
    Struct(StructValue),
    Ref(RefValue),
    Type(TypeDesc),
}

impl Value {
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Value::Bool(_) => TypeDesc::Bool,
            Value::Number(_) => TypeDesc::Number,
            Value::String(_) => TypeDesc::String,
            Value::Blob(_) => TypeDesc::Blob,
            Value::List(items) => {
                TypeDesc::List(Box::new(items.first().map(Value::type_desc).unwrap_or(TypeDesc::Bool)))
            }
            Value::Set(items) => {
                TypeDesc::Set(Box::new(items.first().map(Value::type_desc).unwrap_or(TypeDesc::Bool)))
            }
            Value::Map(entries) => {
                let (k, v) = entries
                    .first()
                    .map(|(k, v)| (k.type_desc(), v.type_desc()))
                    .unwrap_or((TypeDesc::Bool, TypeDesc::Bool));
                TypeDesc::Map(Box::new(k), Box::new(v))
            }
            Value::Struct(s) => TypeDesc::Struct(s.type_.clone()),
            Value::Ref(r) => TypeDesc::Ref(Box::new(match &r.target_type {
                TargetType::Primitive(PrimitiveKind::Bool) => TypeDesc::Bool,
                TargetType::Primitive(PrimitiveKind::Number) => TypeDesc::Number,
                TargetType::Primitive(PrimitiveKind::String) => TypeDesc::String,
                TargetType::Primitive(PrimitiveKind::Blob) => TypeDesc::Blob,
                // A hashed (composite) target type can't be recovered without a chunk
                // store lookup; callers that need the full type resolve it separately.
                TargetType::Hashed(_) => TypeDesc::Type,
            })),
            Value::Type(_) => TypeDesc::Type,
        }
    }
}
