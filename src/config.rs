//! Table configuration.

use serde::{Deserialize, Serialize};

/// How inserts and updates look for duplicate values on unique columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueCheck {
    /// Scan every stored value of each unique column: O(U·N) per insert,
    /// no extra memory.
    #[default]
    Scan,
    /// Keep a hash set of the values of each unique column: O(U) expected per
    /// insert, one extra copy of every unique value.
    Index,
}

/// Per-table options.
///
/// # Example
///
/// ```
/// use sqlfly::{TableConfig, UniqueCheck};
///
/// let config = TableConfig::default();
/// assert_eq!(config.unique_check, UniqueCheck::Scan);
/// assert_eq!(config.initial_capacity, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Duplicate detection strategy for unique columns.
    pub unique_check: UniqueCheck,
    /// Number of rows to reserve room for at construction.
    pub initial_capacity: usize,
}

impl TableConfig {
    /// Uses a hash index for unique columns.
    pub fn indexed(mut self) -> Self {
        self.unique_check = UniqueCheck::Index;
        self
    }

    /// Reserves room for `rows` records.
    pub fn with_capacity(mut self, rows: usize) -> Self {
        self.initial_capacity = rows;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial_config() {
        let config: TableConfig = serde_json::from_str(r#"{"unique_check": "index"}"#).unwrap();
        assert_eq!(config.unique_check, UniqueCheck::Index);
        assert_eq!(config.initial_capacity, 0);

        let config: TableConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TableConfig::default());
    }

    #[test]
    fn test_builders() {
        let config = TableConfig::default().indexed().with_capacity(128);
        assert_eq!(config.unique_check, UniqueCheck::Index);
        assert_eq!(config.initial_capacity, 128);
    }

    #[test]
    fn test_serialize_round_trip_names() {
        let json = serde_json::to_string(&TableConfig::default().indexed()).unwrap();
        assert!(json.contains(r#""unique_check":"index""#));
    }
}
