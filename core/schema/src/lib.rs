//! Schema, table, and row encoding (spec.md §4.5): column/index/constraint descriptors, the
//! column-type widening table used by schema merge, and the row/secondary-index key/value
//! layout that lets table data live in an ordinary `dolt_prolly::Tree<Value, Value>`.

pub mod row;
pub mod schema_codec;
pub mod table;
pub mod types;
pub mod widen;

pub use row::{decode_row, index_entry, row_key, row_value, Row};
pub use schema_codec::{decode_schema, encode_schema};
pub use table::{decode_table, encode_table, Table, TableChildExtractor};
pub use types::{
    CheckDescriptor, ColumnDescriptor, ColumnType, ForeignKeyDescriptor, IndexDescriptor, RefAction, Schema,
};
pub use widen::widen;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),
    #[error("NOT NULL constraint violated")]
    NotNullViolation,
    #[error("corrupt schema/table chunk: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Store(#[from] dolt_chunks::ChunkStoreError),
}
