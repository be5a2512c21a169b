//! Declarative column registry and the generic loader it drives

pub mod fields;
mod table;

pub use fields::{
    DateFormat, DefaultValue, FieldSpec, FieldType, TableSchema, ACQUISITION, PERFORMANCE,
};
pub use table::{read_table, TypedTable, Value};
