use std::cmp::Ordering;

use crate::types::Value;

/// Orders two values the way prolly-tree keys are ordered (spec.md §4.3): numeric natural
/// order, byte-lexicographic strings, lexicographic composites over components, and refs
/// by `(height desc, hash asc)`. Comparing values of different kinds falls back to kind-tag
/// order, which only matters for heterogeneous `Set`/`Map` keys and is not otherwise
/// observable.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.cmp_numeric(y),
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Blob(x), Value::Blob(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) | (Value::Set(x), Value::Set(y)) => {
            compare_sequences(x, y)
        }
        (Value::Map(x), Value::Map(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let key_order = compare_values(&l.0, &r.0);
                if key_order != Ordering::Equal {
                    return key_order;
                }
                let val_order = compare_values(&l.1, &r.1);
                if val_order != Ordering::Equal {
                    return val_order;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Struct(x), Value::Struct(y)) => compare_sequences(&x.values, &y.values),
        (Value::Ref(x), Value::Ref(y)) => x.cmp_ref_order(y),
        (Value::Type(_), Value::Type(_)) => Ordering::Equal,
        (x, y) => kind_rank(x).cmp(&kind_rank(y)),
    }
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Ordering {
    for (l, r) in a.iter().zip(b.iter()) {
        let order = compare_values(l, r);
        if order != Ordering::Equal {
            return order;
        }
    }
    a.len().cmp(&b.len())
}

fn kind_rank(v: &Value) -> u8 {
    match v {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Blob(_) => 3,
        Value::List(_) => 4,
        Value::Set(_) => 5,
        Value::Map(_) => 6,
        Value::Struct(_) => 7,
        Value::Ref(_) => 8,
        Value::Type(_) => 9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Number;

    #[test]
    fn numeric_order_ignores_exponent() {
        let a = Value::Number(Number::from_parts(100, -1)); // 10.0
        let b = Value::Number(Number::from_parts(10, 0)); // 10
        assert_eq!(compare_values(&a, &b), Ordering::Equal);
    }

    #[test]
    fn string_order_is_byte_lexicographic() {
        let a = Value::String("apple".to_string());
        let b = Value::String("banana".to_string());
        assert_eq!(compare_values(&a, &b), Ordering::Less);
    }
}
