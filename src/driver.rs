//! Multi-table driver interface.
//!
//! A [Driver] addresses tables by name and filters rows with typed [Filter]
//! lists instead of expressions. Nothing in this crate implements it yet; the
//! types here let a driver reuse [Table](crate::Table) by rendering its filter
//! lists with [filters_to_expression].

use std::fmt;

use chrono::SecondsFormat;

use crate::data_type::BaseKind;
use crate::schema::Schema;
use crate::value::Value;

/// Comparison operator of a typed [Filter].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        };
        f.write_str(op)
    }
}

/// A named value, used for row cells and `SET` assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

/// `column <operator> value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: LogicalOperator,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: LogicalOperator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    /// Renders the filter as a CEL comparison.
    ///
    /// Returns `None` when the value has no CEL literal: unsupported values
    /// and non-finite floats.
    pub fn to_expression(&self) -> Option<String> {
        Some(format!(
            "{} {} {}",
            self.column,
            self.operator,
            literal(&self.value)?
        ))
    }
}

/// Renders a filter list as the conjunction of its filters.
///
/// An empty list matches everything and renders as `true`.
///
/// ```
/// use sqlfly::Value;
/// use sqlfly::driver::{Filter, LogicalOperator, filters_to_expression};
///
/// let filters = [
///     Filter::new("id", LogicalOperator::Gt, Value::Int(10)),
///     Filter::new("name", LogicalOperator::Eq, Value::Text("bob".into())),
/// ];
/// assert_eq!(
///     filters_to_expression(&filters).unwrap(),
///     r#"id > 10 && name == "bob""#
/// );
/// assert_eq!(filters_to_expression(&[]).unwrap(), "true");
/// ```
pub fn filters_to_expression(filters: &[Filter]) -> Option<String> {
    if filters.is_empty() {
        return Some("true".to_string());
    }
    let parts = filters
        .iter()
        .map(Filter::to_expression)
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(" && "))
}

fn literal(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Uint(u) => Some(format!("{u}u")),
        // Debug keeps the decimal point on whole numbers
        Value::Float(f) if f.is_finite() => Some(format!("{f:?}")),
        Value::Float(_) => None,
        Value::Text(s) => Some(quote(s)),
        Value::Timestamp(t) => Some(format!(
            "timestamp(\"{}\")",
            t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )),
        Value::Unsupported => None,
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A row returned by [Driver::select].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub data: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rows {
    pub data: Vec<Row>,
}

/// Column description exposed by a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    /// Position of the column in its table.
    pub sequence: usize,
    pub unique: bool,
    pub nullable: bool,
    pub kind: BaseKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableMeta {
    /// Describes a table laid out after `schema`. Columns are never nullable.
    pub fn from_schema(name: impl Into<String>, schema: &Schema) -> Self {
        let columns = schema
            .columns
            .iter()
            .enumerate()
            .map(|(sequence, column)| ColumnMeta {
                name: column.name.clone(),
                sequence,
                unique: column.unique,
                nullable: false,
                kind: column.kind,
            })
            .collect();
        Self {
            name: name.into(),
            columns,
        }
    }
}

/// Storage backend addressing tables by name.
pub trait Driver {
    type Error: std::error::Error;

    /// Returns the `fields` of every row of table `from`.
    fn select(&self, from: &str, fields: &[&str]) -> Result<Rows, Self::Error>;

    /// Inserts one row and returns the number of rows written.
    fn insert(
        &mut self,
        into: &str,
        fields: &[&str],
        values: Vec<Value>,
    ) -> Result<usize, Self::Error>;

    /// Applies `set` to the rows matching every filter; returns the number of
    /// rows updated.
    fn update(
        &mut self,
        table: &str,
        set: &[KeyValue],
        filters: &[Filter],
    ) -> Result<usize, Self::Error>;

    /// Removes the rows matching every filter; returns the number of rows
    /// removed.
    fn delete(&mut self, from: &str, filters: &[Filter]) -> Result<usize, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Table;
    use chrono::{DateTime, TimeZone, Utc};

    crate::record! {
        #[derive(Debug, Clone)]
        struct Event {
            id: u64,
            title: String,
            weight: f64,
            urgent: bool,
            at: DateTime<Utc>,
        }
    }

    fn events() -> Table<Event> {
        let mut table = Table::<Event>::new(&["id"]).unwrap();
        let titles = ["boot", "say \"hi\"", "back\\slash", "shutdown"];
        for (i, title) in titles.into_iter().enumerate() {
            table
                .insert(Event {
                    id: i as u64,
                    title: title.to_string(),
                    weight: i as f64 * 0.5,
                    urgent: i % 2 == 1,
                    at: Utc.with_ymd_and_hms(2024, 1, 1 + i as u32, 12, 0, 0).unwrap(),
                })
                .unwrap();
        }
        table
    }

    fn select_ids(table: &Table<Event>, filters: &[Filter]) -> Vec<u64> {
        let expression = filters_to_expression(filters).unwrap();
        table
            .select(&expression, &[], 0, None)
            .unwrap()
            .into_iter()
            .map(|event| event.id)
            .collect()
    }

    #[test]
    fn test_render_literals() {
        let render = |value| Filter::new("c", LogicalOperator::Eq, value).to_expression();

        assert_eq!(render(Value::Int(-3)).unwrap(), "c == -3");
        assert_eq!(render(Value::Uint(3)).unwrap(), "c == 3u");
        assert_eq!(render(Value::Float(2.0)).unwrap(), "c == 2.0");
        assert_eq!(render(Value::Bool(true)).unwrap(), "c == true");
        assert_eq!(render(Value::Text("a\"b".into())).unwrap(), r#"c == "a\"b""#);
        assert_eq!(
            render(Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())).unwrap(),
            r#"c == timestamp("2024-01-02T03:04:05Z")"#
        );
        assert!(render(Value::Float(f64::NAN)).is_none());
        assert!(render(Value::Unsupported).is_none());
    }

    #[test]
    fn test_unrenderable_filter_list() {
        let filters = [
            Filter::new("id", LogicalOperator::Gt, Value::Uint(1)),
            Filter::new("tags", LogicalOperator::Eq, Value::Unsupported),
        ];
        assert!(filters_to_expression(&filters).is_none());
    }

    #[test]
    fn test_filters_select_rows() {
        let table = events();

        assert_eq!(select_ids(&table, &[]), [0, 1, 2, 3]);
        assert_eq!(
            select_ids(&table, &[Filter::new("id", LogicalOperator::GtEq, Value::Uint(2))]),
            [2, 3]
        );
        assert_eq!(
            select_ids(
                &table,
                &[
                    Filter::new("urgent", LogicalOperator::Eq, Value::Bool(true)),
                    Filter::new("weight", LogicalOperator::Lt, Value::Float(1.0)),
                ]
            ),
            [1]
        );
        assert_eq!(
            select_ids(
                &table,
                &[Filter::new("title", LogicalOperator::Eq, Value::Text("say \"hi\"".into()))]
            ),
            [1]
        );
        assert_eq!(
            select_ids(
                &table,
                &[Filter::new("title", LogicalOperator::NotEq, Value::Text("back\\slash".into()))]
            ),
            [0, 1, 3]
        );
        let noon = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();
        assert_eq!(
            select_ids(&table, &[Filter::new("at", LogicalOperator::LtEq, Value::Timestamp(noon))]),
            [0, 1, 2]
        );
    }

    #[test]
    fn test_table_meta() {
        let table = events();
        let meta = TableMeta::from_schema("events", table.schema());

        assert_eq!(meta.name, "events");
        assert_eq!(meta.columns.len(), 5);
        assert!(meta.columns[0].unique);
        assert_eq!(meta.columns[4].name, "at");
        assert_eq!(meta.columns[4].sequence, 4);
        assert_eq!(meta.columns[4].kind, BaseKind::Timestamp);
        assert!(meta.columns.iter().all(|column| !column.nullable));
    }
}
