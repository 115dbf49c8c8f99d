//! Embedded in-memory tables of plain Rust records.
//!
//! A [Table] stores values of one record type. Its columns are derived from
//! the record type itself (see [record!] and [Reflect]), declared unique
//! columns are enforced on insert, and rows are queried with CEL predicate
//! strings such as `age >= 18 && name.startsWith("A")`.

pub mod column;
pub mod config;
pub mod data_type;
pub mod driver;
pub mod error;
pub mod expr;
pub mod field;
pub mod record;
pub mod schema;
pub mod store;
pub mod table;
pub mod value;

pub use column::Column;
pub use config::{TableConfig, UniqueCheck};
pub use data_type::BaseKind;
pub use error::{
    ColumnError, Error, EvaluationError, InsertError, KindMismatch, SchemaError, UpdateError,
};
pub use expr::{Environment, Predicate};
pub use field::Field;
pub use record::{FieldInfo, Record, Reflect, TypeInfo, shallow_equals};
pub use schema::{ColumnDef, Schema, schema_of};
pub use table::{Assignment, OrderBy, SortDirection, Table};
pub use value::Value;
