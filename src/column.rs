use std::sync::Arc;

use bitvec::prelude::*;
use chrono::{DateTime, Utc};

use crate::data_type::BaseKind;
use crate::error::{ColumnError, KindMismatch};
use crate::value::Value;

/// Physical storage for column data.
/// Each variant wraps a collection of a specific type to ensure contiguous memory
/// allocation (columnar storage).
#[derive(Debug, Clone)]
pub enum ColumnData {
    /// Vector of 64-bit signed integers.
    Int(Vec<i64>),
    /// Vector of 64-bit unsigned integers.
    Uint(Vec<u64>),
    /// Vector of 64-bit floats.
    Float(Vec<f64>),
    /// Vector of thread-safe atomic reference-counted strings.
    Text(Vec<Arc<str>>),
    /// Compact bit-vector for boolean values.
    Bool(BitVec),
    /// Vector of UTC instants.
    Timestamp(Vec<DateTime<Utc>>),
}

/// Columnar copy of one schema column.
///
/// The store keeps one [Column] per column next to the records themselves, so
/// uniqueness scans, ordering and predicate activations read typed vectors
/// instead of re-projecting every record.
#[derive(Debug, Clone)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// The kind of every value in the column.
    pub kind: BaseKind,
    /// The actual values stored in the column.
    pub data: ColumnData,
}

impl Column {
    /// Creates a new, empty column with the specified name and kind.
    ///
    /// Returns `None` for [BaseKind::Unsupported], which has no storage.
    pub fn new(name: String, kind: BaseKind) -> Option<Self> {
        let data = match kind {
            BaseKind::Int => ColumnData::Int(vec![]),
            BaseKind::Uint => ColumnData::Uint(vec![]),
            BaseKind::Float => ColumnData::Float(vec![]),
            BaseKind::Bool => ColumnData::Bool(bitvec!()),
            BaseKind::Text => ColumnData::Text(vec![]),
            BaseKind::Timestamp => ColumnData::Timestamp(vec![]),
            BaseKind::Unsupported => return None,
        };
        Some(Self { name, kind, data })
    }

    /// Checks that `value` can be stored in this column.
    pub fn check(&self, value: &Value) -> Result<(), KindMismatch> {
        if value.kind() == self.kind {
            Ok(())
        } else {
            Err(KindMismatch {
                column: self.name.clone(),
                expected: self.kind,
                found: value.kind(),
            })
        }
    }

    /// Appends a new value to the end of the column.
    ///
    /// # Errors
    /// Returns an error if the value's kind does not match the column's kind.
    pub fn push(&mut self, value: Value) -> Result<(), KindMismatch> {
        self.check(&value)?;
        match (&mut self.data, value) {
            (ColumnData::Int(col), Value::Int(v)) => col.push(v),
            (ColumnData::Uint(col), Value::Uint(v)) => col.push(v),
            (ColumnData::Float(col), Value::Float(v)) => col.push(v),
            (ColumnData::Text(col), Value::Text(v)) => col.push(v),
            (ColumnData::Bool(col), Value::Bool(v)) => col.push(v),
            (ColumnData::Timestamp(col), Value::Timestamp(v)) => col.push(v),
            // kinds checked above
            _ => {}
        }
        Ok(())
    }

    /// Returns the number of rows currently stored in the column.
    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int(col) => col.len(),
            ColumnData::Uint(col) => col.len(),
            ColumnData::Float(col) => col.len(),
            ColumnData::Text(col) => col.len(),
            ColumnData::Bool(col) => col.len(),
            ColumnData::Timestamp(col) => col.len(),
        }
    }

    /// Returns true if there is no row in the column, else false.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieves the value at the specified row index.
    ///
    /// Returns `None` if the index is out of bounds.
    pub fn get(&self, row_idx: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Int(col) => col.get(row_idx).map(|v| Value::Int(*v)),
            ColumnData::Uint(col) => col.get(row_idx).map(|v| Value::Uint(*v)),
            ColumnData::Float(col) => col.get(row_idx).map(|v| Value::Float(*v)),
            ColumnData::Text(col) => col.get(row_idx).map(|v| Value::Text(Arc::clone(v))),
            ColumnData::Bool(col) => col.get(row_idx).map(|v| Value::Bool(*v)),
            ColumnData::Timestamp(col) => col.get(row_idx).map(|v| Value::Timestamp(*v)),
        }
    }

    /// Returns the first row holding `value`, comparing with the engine's
    /// exact equality. Linear in the number of rows.
    pub fn position(&self, value: &Value) -> Option<usize> {
        match (&self.data, value) {
            (ColumnData::Int(col), Value::Int(v)) => col.iter().position(|x| x == v),
            (ColumnData::Uint(col), Value::Uint(v)) => col.iter().position(|x| x == v),
            (ColumnData::Float(col), Value::Float(v)) => {
                col.iter().position(|x| x.to_bits() == v.to_bits())
            }
            (ColumnData::Text(col), Value::Text(v)) => {
                col.iter().position(|x| x.as_bytes() == v.as_bytes())
            }
            (ColumnData::Bool(col), Value::Bool(v)) => col.iter().by_vals().position(|x| x == *v),
            (ColumnData::Timestamp(col), Value::Timestamp(v)) => col.iter().position(|x| x == v),
            _ => None,
        }
    }

    /// Replace a value in the column by a new value.
    ///
    /// # Errors
    /// Returns an error if the row index is out of bounds or if the value's
    /// kind does not match the column's kind.
    pub fn set(&mut self, row_idx: usize, value: &Value) -> Result<(), ColumnError> {
        if self.len() <= row_idx {
            return Err(ColumnError::RowOutOfBounds {
                column: self.name.clone(),
                row: row_idx,
                len: self.len(),
            });
        }
        self.check(value)?;
        match (&mut self.data, value) {
            (ColumnData::Int(col), Value::Int(v)) => col[row_idx] = *v,
            (ColumnData::Uint(col), Value::Uint(v)) => col[row_idx] = *v,
            (ColumnData::Float(col), Value::Float(v)) => col[row_idx] = *v,
            (ColumnData::Text(col), Value::Text(v)) => col[row_idx] = Arc::clone(v),
            (ColumnData::Bool(col), Value::Bool(v)) => col.set(row_idx, *v),
            (ColumnData::Timestamp(col), Value::Timestamp(v)) => col[row_idx] = *v,
            // kinds checked above
            _ => {}
        }
        Ok(())
    }

    /// Keeps the rows whose bit is set in `keep` and drops the others,
    /// shifting the remaining rows down. Rows past the end of `keep` are kept.
    pub fn retain(&mut self, keep: &BitSlice) {
        fn retain_vec<T>(col: &mut Vec<T>, keep: &BitSlice) {
            let mut bits = keep.iter().by_vals();
            col.retain(|_| bits.next().unwrap_or(true));
        }

        match &mut self.data {
            ColumnData::Int(col) => retain_vec(col, keep),
            ColumnData::Uint(col) => retain_vec(col, keep),
            ColumnData::Float(col) => retain_vec(col, keep),
            ColumnData::Text(col) => retain_vec(col, keep),
            ColumnData::Timestamp(col) => retain_vec(col, keep),
            ColumnData::Bool(col) => {
                let mut bits = keep.iter().by_vals();
                *col = col
                    .iter()
                    .by_vals()
                    .filter(|_| bits.next().unwrap_or(true))
                    .collect();
            }
        }
    }
}
