//! Error types for table construction, insertion, querying and updates.
//!
//! Each operation family has its own enum so callers can match on exactly the
//! failures that operation can produce; [Error] wraps them all.

use thiserror::Error;

use crate::data_type::BaseKind;

/// Errors raised while deriving a schema from a record type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The inspected type is not a record (named-field struct).
    #[error("the table meta data is not a record: `{0}`")]
    NotARecord(String),

    /// A declared unique column name is the empty string.
    #[error("invalid column name: specified column name is empty")]
    EmptyColumnName,

    /// A declared unique column name matches no visible, supported field.
    #[error("invalid column name: column `{column}` does not exist in `{record}`")]
    ColumnNotFound { column: String, record: String },
}

/// A value whose kind does not fit the column it is written to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column `{column}` holds {expected} values, got {found}")]
pub struct KindMismatch {
    pub column: String,
    pub expected: BaseKind,
    pub found: BaseKind,
}

/// Errors raised when writing into a [Column](crate::Column).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    #[error(transparent)]
    Kind(#[from] KindMismatch),

    /// The written row does not exist.
    #[error("row {row} is out of bounds for column `{column}` of {len} rows")]
    RowOutOfBounds {
        column: String,
        row: usize,
        len: usize,
    },
}

/// Errors raised by [Table::insert](crate::Table::insert).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    /// The inserted value is not a record.
    #[error("problem when inserting data: can not insert non record `{0}`")]
    NotARecord(String),

    /// The inserted record is not of the table's record type.
    #[error("problem when inserting data: incompatible record `{found}`, table holds `{expected}`")]
    IncompatibleType { expected: String, found: String },

    /// The record reports a field value of a different kind than its
    /// declared field type.
    #[error("problem when inserting data: {0}")]
    Field(#[from] KindMismatch),

    /// A unique column already holds the inserted value.
    #[error("problem when inserting data: unique field constraint violation on `{column}`")]
    UniqueViolation { column: String },
}

/// Errors raised while compiling or evaluating a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The expression does not parse or references undeclared columns.
    #[error("problem when evaluating data: cannot compile [{expression}]: {reason}")]
    Compile { expression: String, reason: String },

    /// The expression failed while running against a record.
    #[error("problem when evaluating data: [{expression}] failed: {reason}")]
    Execution { expression: String, reason: String },

    /// The expression ran but produced something other than a boolean.
    #[error("problem when evaluating data: expression do not yield boolean result [{expression}]")]
    NotBoolean { expression: String },

    /// An ordering key names a column that is not in the schema.
    #[error("problem when evaluating data: cannot order by unknown column `{0}`")]
    UnknownColumn(String),
}

/// Errors raised by [Table::update](crate::Table::update) before or while
/// applying assignments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The assignment targets a column that is not in the schema.
    #[error("problem when updating data: unknown column `{0}`")]
    UnknownColumn(String),

    /// The assigned value's kind differs from the column kind.
    #[error("problem when updating data: {0}")]
    Kind(#[from] KindMismatch),

    /// The record field cannot represent the assigned value (for example an
    /// integer out of the field's range).
    #[error("problem when updating data: field `{column}` cannot hold the assigned value")]
    Rejected { column: String },

    /// The column copy of an updated row could not be written.
    #[error("problem when updating data: {0}")]
    Column(#[from] ColumnError),

    /// The updated rows would duplicate a unique column value.
    #[error("problem when updating data: unique field constraint violation on `{column}`")]
    UniqueViolation { column: String },
}

/// Any error produced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Update(#[from] UpdateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_column() {
        let err = InsertError::UniqueViolation {
            column: "id".into(),
        };
        assert!(err.to_string().contains("`id`"));

        let err = SchemaError::ColumnNotFound {
            column: "Visible".into(),
            record: "Dummy".into(),
        };
        assert!(err.to_string().contains("`Visible`"));
    }

    #[test]
    fn test_wrapping_into_crate_error() {
        let err: Error = EvaluationError::NotBoolean {
            expression: "id + 1".into(),
        }
        .into();
        assert!(matches!(err, Error::Evaluation(EvaluationError::NotBoolean { .. })));
        assert!(err.to_string().contains("[id + 1]"));
    }
}
