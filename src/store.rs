use bitvec::prelude::*;
use rustc_hash::FxHashSet;

use crate::column::Column;
use crate::config::{TableConfig, UniqueCheck};
use crate::error::{InsertError, UpdateError};
use crate::schema::Schema;
use crate::value::Value;

/// Row storage of one table.
///
/// Records are kept in insertion order. Next to them the store keeps one
/// [Column] per schema column, aligned row for row with the records, which is
/// what uniqueness checks and queries read.
#[derive(Debug, Clone)]
pub struct RecordStore<R> {
    rows: Vec<R>,
    columns: Vec<Column>,
    /// Positions of the unique columns in `columns`.
    unique: Vec<usize>,
    /// One value set per unique column when [UniqueCheck::Index] is on.
    indexes: Option<Vec<FxHashSet<Value>>>,
}

impl<R> RecordStore<R> {
    /// Creates an empty store laid out after `schema`.
    pub fn new(schema: &Schema, config: &TableConfig) -> Self {
        let columns = schema
            .columns
            .iter()
            .filter_map(|column| Column::new(column.name.clone(), column.kind))
            .collect();
        let unique: Vec<usize> = schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.unique)
            .map(|(position, _)| position)
            .collect();
        let indexes = match config.unique_check {
            UniqueCheck::Scan => None,
            UniqueCheck::Index => Some(vec![FxHashSet::default(); unique.len()]),
        };

        Self {
            rows: Vec::with_capacity(config.initial_capacity),
            columns,
            unique,
            indexes,
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stored records in insertion order.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn get(&self, row_idx: usize) -> Option<&R> {
        self.rows.get(row_idx)
    }

    /// Columnar copy of the schema column at `position`.
    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    /// Values of every column for the record at `row_idx`, in schema order.
    pub fn projection(&self, row_idx: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| column.get(row_idx).unwrap_or(Value::Unsupported))
            .collect()
    }

    /// Appends `record` whose projected column values are `candidate`.
    ///
    /// Nothing is written unless every value has its column's kind and no
    /// unique column already holds the candidate's value.
    pub fn insert(&mut self, record: R, candidate: Vec<Value>) -> Result<(), InsertError> {
        debug_assert_eq!(candidate.len(), self.columns.len());
        for (column, value) in self.columns.iter().zip(&candidate) {
            column.check(value)?;
        }

        if let Some(column) = self.conflict(&candidate) {
            return Err(InsertError::UniqueViolation {
                column: column.name.clone(),
            });
        }

        if let Some(indexes) = &mut self.indexes {
            for (index, &position) in indexes.iter_mut().zip(&self.unique) {
                index.insert(candidate[position].clone());
            }
        }
        for (column, value) in self.columns.iter_mut().zip(candidate) {
            column.push(value)?;
        }
        self.rows.push(record);
        Ok(())
    }

    /// Returns the first unique column already holding the candidate's value.
    fn conflict(&self, candidate: &[Value]) -> Option<&Column> {
        self.unique.iter().enumerate().find_map(|(slot, &position)| {
            let column = &self.columns[position];
            let value = candidate.get(position)?;
            let taken = match &self.indexes {
                Some(indexes) => indexes[slot].contains(value),
                None => column.position(value).is_some(),
            };
            taken.then_some(column)
        })
    }

    /// Replaces records in place. Each update is `(row, record, candidate)`.
    ///
    /// All updates are validated before any is applied: kinds must match and
    /// unique columns must stay distinct across the untouched rows and the
    /// updated rows together.
    pub fn replace(&mut self, updates: Vec<(usize, R, Vec<Value>)>) -> Result<(), UpdateError> {
        for (_, _, candidate) in &updates {
            for (column, value) in self.columns.iter().zip(candidate) {
                column.check(value)?;
            }
        }

        let mut touched = bitvec![0; self.rows.len()];
        for (row, _, _) in &updates {
            if *row < touched.len() {
                touched.set(*row, true);
            }
        }

        for &position in &self.unique {
            let column = &self.columns[position];
            let untouched: FxHashSet<Value> = (0..column.len())
                .filter(|row| !touched[*row])
                .filter_map(|row| column.get(row))
                .collect();
            let mut seen = FxHashSet::default();
            for (_, _, candidate) in &updates {
                let Some(value) = candidate.get(position) else {
                    continue;
                };
                if untouched.contains(value) || !seen.insert(value) {
                    return Err(UpdateError::UniqueViolation {
                        column: column.name.clone(),
                    });
                }
            }
        }

        for (row, record, candidate) in updates {
            let Some(slot) = self.rows.get_mut(row) else {
                continue;
            };
            *slot = record;
            for (column, value) in self.columns.iter_mut().zip(&candidate) {
                column.set(row, value)?;
            }
        }
        self.rebuild_indexes();
        Ok(())
    }

    /// Drops the records whose bit is cleared in `keep`, shifting later
    /// records down. Returns how many records were removed.
    pub fn retain(&mut self, keep: &BitSlice) -> usize {
        let before = self.rows.len();
        let mut bits = keep.iter().by_vals();
        self.rows.retain(|_| bits.next().unwrap_or(true));
        for column in &mut self.columns {
            column.retain(keep);
        }
        self.rebuild_indexes();
        before - self.rows.len()
    }

    fn rebuild_indexes(&mut self) {
        let Some(indexes) = &mut self.indexes else {
            return;
        };
        for (index, &position) in indexes.iter_mut().zip(&self.unique) {
            let column = &self.columns[position];
            *index = (0..column.len()).filter_map(|row| column.get(row)).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::BaseKind;
    use crate::record::{FieldInfo, TypeInfo};

    fn schema() -> Schema {
        let info = TypeInfo::Record {
            name: "Item",
            fields: vec![
                FieldInfo::visible("id", BaseKind::Int),
                FieldInfo::visible("name", BaseKind::Text),
                FieldInfo::visible("score", BaseKind::Float),
            ],
        };
        Schema::derive(&info, &["id", "score"]).unwrap()
    }

    fn item(id: i64, name: &str, score: f64) -> Vec<Value> {
        vec![Value::Int(id), Value::Text(name.into()), Value::Float(score)]
    }

    fn stores() -> [RecordStore<&'static str>; 2] {
        let schema = schema();
        [
            RecordStore::new(&schema, &TableConfig::default()),
            RecordStore::new(&schema, &TableConfig::default().indexed()),
        ]
    }

    #[test]
    fn test_insert_appends_in_order() {
        for mut store in stores() {
            store.insert("a", item(1, "a", 0.5)).unwrap();
            store.insert("b", item(2, "b", 1.5)).unwrap();

            assert_eq!(store.len(), 2);
            assert_eq!(store.rows(), ["a", "b"]);
            assert_eq!(store.projection(1), item(2, "b", 1.5));
        }
    }

    #[test]
    fn test_unique_violation_leaves_store_unchanged() {
        for mut store in stores() {
            store.insert("a", item(1, "a", 0.5)).unwrap();

            let err = store.insert("b", item(1, "b", 9.0)).unwrap_err();
            assert_eq!(err, InsertError::UniqueViolation { column: "id".into() });

            let err = store.insert("c", item(3, "c", 0.5)).unwrap_err();
            assert_eq!(
                err,
                InsertError::UniqueViolation {
                    column: "score".into()
                }
            );

            assert_eq!(store.len(), 1);
            assert_eq!(store.column(0).unwrap().len(), 1);
            assert_eq!(store.column(2).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_duplicates_allowed_on_plain_columns() {
        for mut store in stores() {
            store.insert("a", item(1, "same", 0.5)).unwrap();
            store.insert("b", item(2, "same", 1.5)).unwrap();
            assert_eq!(store.len(), 2);
        }
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        for mut store in stores() {
            let err = store
                .insert("a", vec![Value::Uint(1), Value::Text("a".into()), Value::Float(0.0)])
                .unwrap_err();
            assert!(matches!(err, InsertError::Field(_)));
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_retain_renumbers_and_frees_unique_values() {
        for mut store in stores() {
            for (i, name) in ["a", "b", "c", "d"].into_iter().enumerate() {
                store.insert(name, item(i as i64, name, i as f64)).unwrap();
            }

            let removed = store.retain(&bitvec![1, 0, 1, 0]);
            assert_eq!(removed, 2);
            assert_eq!(store.rows(), ["a", "c"]);
            assert_eq!(store.projection(1), item(2, "c", 2.0));

            // id 1 is free again
            store.insert("b2", item(1, "b", 10.0)).unwrap();
            assert_eq!(store.len(), 3);
        }
    }

    #[test]
    fn test_replace_checks_uniqueness() {
        for mut store in stores() {
            store.insert("a", item(1, "a", 0.5)).unwrap();
            store.insert("b", item(2, "b", 1.5)).unwrap();
            store.insert("c", item(3, "c", 2.5)).unwrap();

            // clashes with an untouched row
            let err = store.replace(vec![(0, "a", item(2, "a", 0.5))]).unwrap_err();
            assert_eq!(err, UpdateError::UniqueViolation { column: "id".into() });

            // clashes between updated rows
            let err = store
                .replace(vec![(0, "a", item(7, "a", 0.5)), (1, "b", item(7, "b", 1.5))])
                .unwrap_err();
            assert_eq!(err, UpdateError::UniqueViolation { column: "id".into() });
            assert_eq!(store.projection(0), item(1, "a", 0.5));

            // swapping values between updated rows is fine
            store
                .replace(vec![(0, "a2", item(2, "a", 0.5)), (1, "b2", item(1, "b", 1.5))])
                .unwrap();
            assert_eq!(store.rows(), ["a2", "b2", "c"]);
            assert_eq!(store.projection(0), item(2, "a", 0.5));

            let err = store.insert("d", item(2, "d", 9.0)).unwrap_err();
            assert_eq!(err, InsertError::UniqueViolation { column: "id".into() });
        }
    }
}
