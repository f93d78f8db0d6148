//! Post-merge constraint checking (spec.md §4.6: "Constraint checking (FK, unique, check)
//! runs after row-merge; violations are recorded in the constraint-violations map.").
//! SPEC_FULL.md §4.6 pins the record shape: `(table, kind: {ForeignKey, Unique, Check},
//! PK, description)`.
//!
//! Check-constraint expressions are opaque blobs to this crate (spec.md §1: the SQL
//! planner/executor is out of scope), so `Check` violations are never produced here — only
//! a higher layer that can evaluate expressions could detect them. `ForeignKey` and
//! `Unique` violations are structural and checkable with only what this crate already has.

use dolt_codec::{compare_values, Value};
use dolt_schema::{index_entry, row_key, IndexDescriptor, Row, Schema};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    ForeignKey,
    Unique,
    Check,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub table: String,
    pub kind: ViolationKind,
    pub pk: Value,
    pub description: String,
}

/// Flags a row whose foreign-key columns don't match a PK present in `ref_table_pks` (the
/// referenced table's current PK set, supplied by the caller since this crate has no
/// whole-database view). `Value` has no `std::hash::Hash` impl (it orders by
/// `compare_values`, not hash), so the PK set is a plain slice rather than a `HashSet`.
pub fn check_foreign_keys(
    table: &str,
    schema: &Schema,
    rows: &[Row],
    fk: &dolt_schema::ForeignKeyDescriptor,
    ref_table_pks: &[Value],
) -> Vec<ConstraintViolation> {
    let mut out = Vec::new();
    for row in rows {
        let mut fk_values = Vec::with_capacity(fk.columns.len());
        for name in &fk.columns {
            let Some(pos) = schema.columns.iter().position(|c| c.name == *name) else { continue };
            fk_values.push(row[pos].clone());
        }
        if fk_values.len() != fk.columns.len() {
            continue;
        }
        let fk_key = Value::List(fk_values);
        if !ref_table_pks.iter().any(|pk| values_equal_as_sets(pk, &fk_key)) {
            out.push(ConstraintViolation {
                table: table.to_string(),
                kind: ViolationKind::ForeignKey,
                pk: row_key(schema, row),
                description: format!("foreign key {} has no matching row in {}", fk.name, fk.ref_table),
            });
        }
    }
    out
}

fn values_equal_as_sets(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == std::cmp::Ordering::Equal
}

/// Flags every row beyond the first that shares a unique index's indexed values.
pub fn check_unique(table: &str, schema: &Schema, rows: &[Row], index: &IndexDescriptor) -> Vec<ConstraintViolation> {
    if !index.unique {
        return Vec::new();
    }
    let mut seen: Vec<Value> = Vec::new();
    let mut out = Vec::new();
    for row in rows {
        let Ok((key, _)) = index_entry(schema, index, row) else { continue };
        if seen.iter().any(|k| values_equal_as_sets(k, &key)) {
            out.push(ConstraintViolation {
                table: table.to_string(),
                kind: ViolationKind::Unique,
                pk: row_key(schema, row),
                description: format!("duplicate value for unique index {}", index.name),
            });
        } else {
            seen.push(key);
        }
    }
    out
}
