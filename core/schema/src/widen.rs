//! The column-type widening table (spec.md §9's Open Question, pinned in SPEC_FULL.md
//! §4.5): `Int8 < Int16 < Int32 < Int64`, `Float32 < Float64`, `Varchar(n) < Varchar(m)` for
//! `m >= n`, `Decimal(p1,s1) < Decimal(p2,s2)` iff `s1 == s2 && p2 >= p1`. Any other pair of
//! distinct types does not widen — a schema-merge column type change outside these families
//! is a conflict (spec.md §4.6).

use crate::types::ColumnType;

/// Returns the wider of `a` and `b` if one widens to the other (or they're equal);
/// `None` means the pair is a schema conflict.
pub fn widen(a: &ColumnType, b: &ColumnType) -> Option<ColumnType> {
    use ColumnType::*;

    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (Int8 | Int16 | Int32 | Int64, Int8 | Int16 | Int32 | Int64) => {
            Some(wider_int(int_rank(a), int_rank(b)))
        }
        (Float32, Float64) | (Float64, Float32) => Some(Float64),
        (Varchar(n), Varchar(m)) => Some(Varchar(*n.max(m))),
        (
            Decimal { precision: p1, scale: s1 },
            Decimal { precision: p2, scale: s2 },
        ) if s1 == s2 => Some(Decimal { precision: *p1.max(p2), scale: *s1 }),
        _ => None,
    }
}

fn int_rank(t: &ColumnType) -> u8 {
    match t {
        ColumnType::Int8 => 0,
        ColumnType::Int16 => 1,
        ColumnType::Int32 => 2,
        ColumnType::Int64 => 3,
        _ => unreachable!("int_rank called on a non-integer type"),
    }
}

fn wider_int(a: u8, b: u8) -> ColumnType {
    match a.max(b) {
        0 => ColumnType::Int8,
        1 => ColumnType::Int16,
        2 => ColumnType::Int32,
        _ => ColumnType::Int64,
    }
}
