use std::any::Any;
use std::cmp::Ordering;

use bitvec::prelude::*;
use tracing::{debug, trace};

use crate::config::TableConfig;
use crate::error::{Error, EvaluationError, InsertError, SchemaError, UpdateError};
use crate::expr::Environment;
use crate::record::{Record, Reflect, TypeInfo};
use crate::schema::{Schema, schema_of};
use crate::store::RecordStore;
use crate::value::Value;

/// Sort direction of an [OrderBy] key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// One `SET column = value` assignment of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// An in-memory table of `R` records.
///
/// The schema is derived from `R` once, through the process-wide schema
/// registry. Records are validated against it on insert; declared unique
/// columns reject duplicate values. Queries are CEL expressions over the
/// table's columns.
///
/// The table does no locking of its own: mutating operations take `&mut self`,
/// callers sharing a table across threads wrap it in their own lock.
///
/// # Example
///
/// ```
/// use sqlfly::{Table, record};
///
/// record! {
///     #[derive(Debug, Clone)]
///     pub struct User {
///         pub id: i64,
///         pub name: String,
///     }
/// }
///
/// let mut users = Table::<User>::new(&["id"]).unwrap();
/// users.insert(User { id: 1, name: "Alice".into() }).unwrap();
/// users.insert(User { id: 2, name: "Bob".into() }).unwrap();
/// assert!(users.insert(User { id: 1, name: "Carol".into() }).is_err());
///
/// let found = users.select("name.startsWith(\"B\")", &[], 0, None).unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].id, 2);
/// assert_eq!(users.count(), 2);
/// ```
#[derive(Debug)]
pub struct Table<R> {
    schema: Schema,
    environment: Environment,
    store: RecordStore<R>,
    config: TableConfig,
}

impl<R: Record> Table<R> {
    /// Creates an empty table whose `unique` columns must hold distinct values.
    ///
    /// # Errors
    /// Returns a [SchemaError] if `R` is not a record or a unique column name
    /// is empty or not a visible, supported field of `R`.
    pub fn new<S: AsRef<str>>(unique: &[S]) -> Result<Self, SchemaError> {
        Self::with_config(unique, TableConfig::default())
    }

    /// Same as [Table::new] with explicit options.
    pub fn with_config<S: AsRef<str>>(
        unique: &[S],
        config: TableConfig,
    ) -> Result<Self, SchemaError> {
        let schema = schema_of::<R>()?.with_unique(unique)?;
        let environment = Environment::from_schema(&schema);
        let store = RecordStore::new(&schema, &config);
        debug!(
            record = %schema.record,
            columns = schema.len(),
            unique = schema.unique_columns().count(),
            unique_check = ?config.unique_check,
            "created table"
        );

        Ok(Self {
            schema,
            environment,
            store,
            config,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Number of stored records.
    pub fn count(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Record at insertion position `position`.
    pub fn get(&self, position: usize) -> Option<&R> {
        self.store.get(position)
    }

    /// Iterates over the records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.store.rows().iter()
    }

    /// Appends a record.
    ///
    /// The record is stored only if it has the table's record type and no
    /// unique column already holds one of its values; otherwise the table is
    /// left unchanged.
    ///
    /// # Errors
    /// - [InsertError::NotARecord] if `V` is not a record type.
    /// - [InsertError::IncompatibleType] if `V` is not the table's record type.
    /// - [InsertError::UniqueViolation] naming the first unique column whose
    ///   value is already stored.
    pub fn insert<V: Reflect>(&mut self, record: V) -> Result<(), InsertError> {
        let info = V::type_info();
        let TypeInfo::Record { name, .. } = &info else {
            return Err(InsertError::NotARecord(info.name()));
        };
        let incompatible = || InsertError::IncompatibleType {
            expected: self.schema.record.clone(),
            found: (*name).to_string(),
        };
        if *name != self.schema.record {
            return Err(incompatible());
        }
        let record: R = match (Box::new(record) as Box<dyn Any>).downcast::<R>() {
            Ok(record) => *record,
            Err(_) => return Err(incompatible()),
        };

        let candidate = self.schema.project(record.values());
        self.store
            .insert(record, candidate)
            .inspect_err(|err| debug!(record = %self.schema.record, %err, "rejected insert"))
    }

    /// Returns the records matching `filter`.
    ///
    /// Matching records come in insertion order, then are sorted by
    /// `order_by` (a stable sort, so ties keep insertion order). The first
    /// `offset` are skipped and at most `limit` are returned; `None` means no
    /// limit.
    ///
    /// # Errors
    /// - [EvaluationError::Compile] if `filter` does not compile against the
    ///   table's columns.
    /// - [EvaluationError::Execution] or [EvaluationError::NotBoolean] if it
    ///   fails on any record; no partial result is returned.
    /// - [EvaluationError::UnknownColumn] if an ordering key is not a column.
    pub fn select(
        &self,
        filter: &str,
        order_by: &[OrderBy],
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<&R>, EvaluationError> {
        let matched = self.filter(filter)?;
        let mut positions: Vec<usize> = matched.iter_ones().collect();

        if !order_by.is_empty() {
            self.sort(&mut positions, order_by)?;
        }

        Ok(positions
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .filter_map(|position| self.store.get(position))
            .collect())
    }

    /// Applies `set` to every record matching `filter` and returns how many
    /// records were updated.
    ///
    /// Either every matching record is updated or none is.
    ///
    /// # Errors
    /// - [UpdateError::UnknownColumn] if an assignment targets a column that is
    ///   not in the schema.
    /// - [UpdateError::Kind] or [UpdateError::Rejected] if a value does not fit
    ///   its column.
    /// - [UpdateError::UniqueViolation] if the update would duplicate a unique
    ///   value.
    /// - Any [EvaluationError] raised by `filter`.
    pub fn update(&mut self, set: &[Assignment], filter: &str) -> Result<usize, Error>
    where
        R: Clone,
    {
        let targets = set
            .iter()
            .map(|assignment| {
                let position = self
                    .schema
                    .position(&assignment.column)
                    .ok_or_else(|| UpdateError::UnknownColumn(assignment.column.clone()))?;
                if let Some(stored) = self.store.column(position) {
                    stored.check(&assignment.value)?;
                }
                Ok((&self.schema.columns[position], &assignment.value))
            })
            .collect::<Result<Vec<_>, UpdateError>>()?;

        let matched = self.filter(filter)?;
        let mut updates = Vec::with_capacity(matched.count_ones());
        for position in matched.iter_ones() {
            let Some(mut record) = self.store.get(position).cloned() else {
                continue;
            };
            for (column, value) in &targets {
                if !record.set_value(column.field, value) {
                    return Err(UpdateError::Rejected {
                        column: column.name.clone(),
                    }
                    .into());
                }
            }
            let candidate = self.schema.project(record.values());
            updates.push((position, record, candidate));
        }

        let updated = updates.len();
        self.store.replace(updates)?;
        debug!(record = %self.schema.record, updated, "updated records");
        Ok(updated)
    }

    /// Removes every record matching `filter` and returns how many were
    /// removed. Later records move up to fill the gaps.
    ///
    /// # Errors
    /// Any [EvaluationError] raised by `filter`; nothing is removed then.
    pub fn delete(&mut self, filter: &str) -> Result<usize, EvaluationError> {
        let matched = self.filter(filter)?;
        if matched.not_any() {
            return Ok(0);
        }
        let removed = self.store.retain(&!matched);
        debug!(record = %self.schema.record, removed, "deleted records");
        Ok(removed)
    }

    /// Evaluates `filter` against every record, in insertion order.
    fn filter(&self, filter: &str) -> Result<BitVec, EvaluationError> {
        let predicate = self.environment.compile(filter)?;
        let matched = predicate.matches(
            &self.environment,
            (0..self.store.len()).map(|row| self.store.projection(row)),
        )?;
        trace!(
            record = %self.schema.record,
            filter,
            scanned = matched.len(),
            matched = matched.count_ones(),
            "evaluated filter"
        );
        Ok(matched)
    }

    /// Sorts the provided positions in-place based on the `ORDER BY` keys.
    ///
    /// For each comparison the keys are tried in order: if the first column
    /// compares equal, the next one decides, and so on.
    fn sort(&self, positions: &mut [usize], order_by: &[OrderBy]) -> Result<(), EvaluationError> {
        let keys = order_by
            .iter()
            .map(|key| {
                let column = self
                    .schema
                    .position(&key.column)
                    .and_then(|position| self.store.column(position))
                    .ok_or_else(|| EvaluationError::UnknownColumn(key.column.clone()))?;
                Ok((column, key.direction == SortDirection::Desc))
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        positions.sort_by(|a, b| {
            for (column, is_desc) in &keys {
                let mut ord = column.get(*a).cmp(&column.get(*b));
                if *is_desc {
                    ord = ord.reverse();
                }
                // if it's not equal no need to compare more
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        Ok(())
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.store.rows().iter()
    }
}
