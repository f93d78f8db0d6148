//! Column, index, and constraint descriptors (spec.md §4.5): "A schema is a typed list of
//! column descriptors (name, type, PK position?, nullable, default expression blob,
//! auto-increment?) plus a list of index descriptors and a list of check/FK descriptors."

use dolt_codec::{PrimitiveKind, TypeDesc};

/// A column's declared SQL type. Distinct from [`dolt_codec::TypeDesc`]: every variant here
/// maps to exactly one of the codec's four scalar kinds (`codec_primitive`), but several
/// `ColumnType`s can share a kind (`Int32` and `Int64` both store as `Value::Number`) while
/// differing in the widening rules that govern schema merge (spec.md §4.6).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Varchar(u32),
    Decimal { precision: u8, scale: u8 },
    Blob,
}

impl ColumnType {
    pub fn codec_primitive(&self) -> PrimitiveKind {
        match self {
            ColumnType::Bool => PrimitiveKind::Bool,
            ColumnType::Int8
            | ColumnType::Int16
            | ColumnType::Int32
            | ColumnType::Int64
            | ColumnType::Float32
            | ColumnType::Float64
            | ColumnType::Decimal { .. } => PrimitiveKind::Number,
            ColumnType::Varchar(_) => PrimitiveKind::String,
            ColumnType::Blob => PrimitiveKind::Blob,
        }
    }

    pub fn type_desc(&self) -> TypeDesc {
        match self.codec_primitive() {
            PrimitiveKind::Bool => TypeDesc::Bool,
            PrimitiveKind::Number => TypeDesc::Number,
            PrimitiveKind::String => TypeDesc::String,
            PrimitiveKind::Blob => TypeDesc::Blob,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub col_type: ColumnType,
    /// `Some(i)` for the `i`-th column of the primary key (0-based, in key order);
    /// `None` for a non-PK column.
    pub pk_position: Option<u32>,
    pub nullable: bool,
    /// Opaque default-expression bytes; this crate never interprets them (spec.md §1: the
    /// SQL planner/executor are out of scope).
    pub default: Option<Vec<u8>>,
    pub auto_increment: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    /// Ordered column names the index is keyed on.
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckDescriptor {
    pub name: String,
    /// Opaque check-expression bytes.
    pub expression: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefAction {
    NoAction,
    Cascade,
    SetNull,
    Restrict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: RefAction,
    pub on_update: RefAction,
}

/// Schemas are values: two tables with identical column/index/constraint descriptors share
/// a schema chunk (spec.md §4.5).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Schema {
    pub columns: Vec<ColumnDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
    pub checks: Vec<CheckDescriptor>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl Schema {
    /// PK columns in key order (by `pk_position`).
    pub fn pk_columns(&self) -> Vec<&ColumnDescriptor> {
        let mut pk: Vec<&ColumnDescriptor> = self.columns.iter().filter(|c| c.pk_position.is_some()).collect();
        pk.sort_by_key(|c| c.pk_position.unwrap());
        pk
    }

    /// Non-PK columns, in declared order.
    pub fn non_pk_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| c.pk_position.is_none()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}
