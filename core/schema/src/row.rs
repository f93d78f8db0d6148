//! Row and secondary-index key/value encoding (spec.md §4.5: "a table's rows are a prolly
//! tree keyed by the encoded PK tuple, with the encoded non-PK tuple as the leaf value").
//!
//! Rows are ordinary [`dolt_codec::Value`]s, not a bespoke format: a row's key is
//! `Value::List` of its PK column values in key order, and its leaf value is `Value::List`
//! of its non-PK column values in declared order. This lets the row tree reuse
//! `dolt_prolly::Tree<Value, Value>` and the generic codec unchanged.

use dolt_codec::Value;

use crate::types::{IndexDescriptor, Schema};
use crate::SchemaError;

/// A full row, one value per `schema.columns`, in declared column order.
pub type Row = Vec<Value>;

fn column_value<'a>(schema: &Schema, row: &'a [Value], name: &str) -> Result<&'a Value, SchemaError> {
    let pos = schema.columns.iter().position(|c| c.name == name).ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))?;
    row.get(pos).ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
}

/// Builds the prolly-tree key for `row`: the PK columns, in `pk_position` order.
pub fn row_key(schema: &Schema, row: &[Value]) -> Value {
    let values = schema
        .pk_columns()
        .into_iter()
        .map(|col| {
            let pos = schema.columns.iter().position(|c| c.name == col.name).expect("pk column is in columns");
            row[pos].clone()
        })
        .collect();
    Value::List(values)
}

/// Builds the prolly-tree leaf value for `row`: the non-PK columns, in declared order.
pub fn row_value(schema: &Schema, row: &[Value]) -> Value {
    let values = schema
        .non_pk_columns()
        .into_iter()
        .map(|col| {
            let pos = schema.columns.iter().position(|c| c.name == col.name).expect("non-pk column is in columns");
            row[pos].clone()
        })
        .collect();
    Value::List(values)
}

/// Reassembles a full row from a `(key, value)` prolly-tree entry, back into declared
/// column order.
pub fn decode_row(schema: &Schema, key: &Value, value: &Value) -> Result<Row, SchemaError> {
    let pk_values = match key {
        Value::List(v) => v,
        _ => return Err(SchemaError::TypeMismatch("row key is not a list")),
    };
    let non_pk_values = match value {
        Value::List(v) => v,
        _ => return Err(SchemaError::TypeMismatch("row value is not a list")),
    };

    let pk_cols = schema.pk_columns();
    let non_pk_cols = schema.non_pk_columns();
    if pk_values.len() != pk_cols.len() || non_pk_values.len() != non_pk_cols.len() {
        return Err(SchemaError::TypeMismatch("row arity does not match schema"));
    }

    let mut row: Vec<Option<Value>> = vec![None; schema.columns.len()];
    for (col, value) in pk_cols.iter().zip(pk_values) {
        let pos = schema.columns.iter().position(|c| c.name == col.name).expect("pk column is in columns");
        row[pos] = Some(value.clone());
    }
    for (col, value) in non_pk_cols.iter().zip(non_pk_values) {
        let pos = schema.columns.iter().position(|c| c.name == col.name).expect("non-pk column is in columns");
        row[pos] = Some(value.clone());
    }

    row.into_iter().map(|v| v.ok_or(SchemaError::TypeMismatch("row is missing a column"))).collect()
}

/// Builds the `(key, value)` pair to store in a secondary index's prolly tree (spec.md
/// §4.5): a unique index keys on its declared columns and carries the row's PK as the
/// value (for the PK lookup after an index hit); a non-unique index folds the PK into the
/// key itself, since multiple rows can share the same indexed values and the key must stay
/// unique, and carries no useful value.
pub fn index_entry(schema: &Schema, index: &IndexDescriptor, row: &[Value]) -> Result<(Value, Value), SchemaError> {
    let mut indexed: Vec<Value> = Vec::with_capacity(index.columns.len());
    for name in &index.columns {
        indexed.push(column_value(schema, row, name)?.clone());
    }
    let pk = row_key(schema, row);

    if index.unique {
        Ok((Value::List(indexed), pk))
    } else {
        indexed.push(pk);
        Ok((Value::List(indexed), Value::Bool(true)))
    }
}
