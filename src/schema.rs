use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::data_type::BaseKind;
use crate::error::SchemaError;
use crate::record::{Reflect, TypeInfo};
use crate::value::Value;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: BaseKind,
    /// Whether stored values of this column must be pairwise distinct.
    pub unique: bool,
    /// Declaration position of the source field inside the record.
    pub field: usize,
}

/// Ordered columns derived from a record type.
///
/// Only visible fields of a supported kind become columns, in declaration
/// order. A schema is derived once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Name of the record type the schema was derived from.
    pub record: String,
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Derives the schema of `info` and marks `unique` columns.
    ///
    /// References are resolved to the type they point at first.
    ///
    /// # Errors
    /// - [SchemaError::NotARecord] if the resolved type is not a record.
    /// - [SchemaError::EmptyColumnName] if a unique column name is empty.
    /// - [SchemaError::ColumnNotFound] if a unique column name is not a
    ///   visible field of a supported kind.
    pub fn derive<S: AsRef<str>>(info: &TypeInfo, unique: &[S]) -> Result<Self, SchemaError> {
        let TypeInfo::Record { name, fields } = info.resolve() else {
            return Err(SchemaError::NotARecord(info.name()));
        };

        let columns = fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.visible && field.kind.is_supported())
            .map(|(position, field)| ColumnDef {
                name: field.name.to_string(),
                kind: field.kind,
                unique: false,
                field: position,
            })
            .collect();

        Self {
            record: (*name).to_string(),
            columns,
        }
        .with_unique(unique)
    }

    /// Returns a copy of this schema with the named columns marked unique.
    ///
    /// Listing a column twice is the same as listing it once. An empty list is
    /// always valid.
    pub fn with_unique<S: AsRef<str>>(&self, unique: &[S]) -> Result<Self, SchemaError> {
        let mut schema = self.clone();
        for name in unique.iter().map(AsRef::as_ref) {
            if name.is_empty() {
                return Err(SchemaError::EmptyColumnName);
            }
            let column = schema
                .columns
                .iter_mut()
                .find(|column| column.name == name)
                .ok_or_else(|| SchemaError::ColumnNotFound {
                    column: name.to_string(),
                    record: self.record.clone(),
                })?;
            column.unique = true;
        }
        Ok(schema)
    }

    /// Returns the column called `name`, if any.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns the position of the column called `name`, if any.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Iterates over the unique columns.
    pub fn unique_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|column| column.unique)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Picks the column values out of a record's field values.
    ///
    /// `fields` holds one value per record field in declaration order, as
    /// returned by [Record::values](crate::Record::values). The result holds
    /// one value per column; a missing field yields [Value::Unsupported].
    pub fn project(&self, mut fields: Vec<Value>) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| {
                fields
                    .get_mut(column.field)
                    .map(|value| std::mem::replace(value, Value::Unsupported))
                    .unwrap_or(Value::Unsupported)
            })
            .collect()
    }
}

static REGISTRY: LazyLock<RwLock<FxHashMap<TypeId, Arc<Schema>>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// Returns the schema of `T`, deriving it on first use.
///
/// Schemas are cached per type for the lifetime of the process; the cached
/// schema has no unique columns, tables mark theirs with
/// [Schema::with_unique].
pub fn schema_of<T: Reflect>() -> Result<Arc<Schema>, SchemaError> {
    let key = TypeId::of::<T>();
    if let Some(schema) = REGISTRY.read().get(&key) {
        return Ok(Arc::clone(schema));
    }

    let schema = Arc::new(Schema::derive::<&str>(&T::type_info(), &[])?);
    tracing::debug!(record = %schema.record, columns = schema.len(), "registered schema");
    Ok(Arc::clone(REGISTRY.write().entry(key).or_insert(schema)))
}
