//! Schema snapshot used to check that generated SQL only names tables and
//! columns that exist.
//!
//! The on-disk shape is the one produced by schema introspection:
//!
//! ```json
//! {
//!   "customers": {
//!     "columns": ["customerNumber", "customerName", "country"],
//!     "primary_key": "customerNumber",
//!     "foreign_keys": {}
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("Failed to read schema file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema description")]
    Parse(#[from] serde_json::Error),

    #[error("Table '{table}' lists column '{column}' more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("Failed to introspect schema: {0}")]
    Introspection(String),
}

/// Columns and keys of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Column names in ordinal order.
    pub columns: Vec<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Column name to `"table.column"` reference.
    #[serde(default)]
    pub foreign_keys: BTreeMap<String, String>,
}

impl TableSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TableSchema {
            columns: columns.into_iter().map(Into::into).collect(),
            primary_key: None,
            foreign_keys: BTreeMap::new(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn with_foreign_key(mut self, column: impl Into<String>, target: impl Into<String>) -> Self {
        self.foreign_keys.insert(column.into(), target.into());
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Immutable mapping from table name to [`TableSchema`]. Names are matched
/// case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDescriptor {
    tables: BTreeMap<String, TableSchema>,
}

impl SchemaDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: TableSchema) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: SchemaDescriptor = serde_json::from_str(json)?;
        schema.check_unique_columns()?;
        Ok(schema)
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableSchema)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// First table (in name order) that has `column`.
    pub fn find_column(&self, column: &str) -> Option<&str> {
        self.tables()
            .find(|(_, table)| table.has_column(column))
            .map(|(name, _)| name)
    }

    /// Renders the schema as the plain-text block handed to a SQL generator.
    pub fn render_for_prompt(&self) -> String {
        let mut out = Vec::new();
        for (name, table) in self.tables() {
            out.push(format!("Table: {name}"));
            out.push("  Columns:".to_string());
            for column in &table.columns {
                let mut line = format!("    - {column}");
                if table.primary_key.as_deref() == Some(column.as_str()) {
                    line.push_str(" [PRIMARY KEY]");
                }
                if let Some(target) = table.foreign_keys.get(column) {
                    line.push_str(&format!(" [FK -> {target}]"));
                }
                out.push(line);
            }
        }
        out.join("\n")
    }

    fn check_unique_columns(&self) -> Result<(), SchemaError> {
        for (name, table) in self.tables() {
            for (i, column) in table.columns.iter().enumerate() {
                if table.columns[..i].contains(column) {
                    return Err(SchemaError::DuplicateColumn {
                        table: name.to_string(),
                        column: column.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, TableSchema)> for SchemaDescriptor {
    fn from_iter<I: IntoIterator<Item = (String, TableSchema)>>(iter: I) -> Self {
        SchemaDescriptor {
            tables: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC_MODELS: &str = r#"{
        "customers": {
            "columns": ["customerNumber", "customerName", "country"],
            "primary_key": "customerNumber",
            "foreign_keys": {}
        },
        "orders": {
            "columns": ["orderNumber", "customerNumber", "status"],
            "primary_key": "orderNumber",
            "foreign_keys": {"customerNumber": "customers.customerNumber"}
        }
    }"#;

    #[test]
    fn test_parse_validation_shape() {
        let schema = SchemaDescriptor::from_json(CLASSIC_MODELS).unwrap();
        assert_eq!(schema.len(), 2);
        let orders = schema.table("orders").unwrap();
        assert_eq!(orders.primary_key.as_deref(), Some("orderNumber"));
        assert_eq!(
            orders.foreign_keys.get("customerNumber").map(String::as_str),
            Some("customers.customerNumber")
        );
    }

    #[test]
    fn test_optional_keys_default() {
        let schema = SchemaDescriptor::from_json(r#"{"t": {"columns": ["a"]}}"#).unwrap();
        let t = schema.table("t").unwrap();
        assert!(t.primary_key.is_none());
        assert!(t.foreign_keys.is_empty());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = SchemaDescriptor::from_json(r#"{"t": {"columns": ["a", "a"]}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_table_names_are_case_sensitive() {
        let schema = SchemaDescriptor::from_json(CLASSIC_MODELS).unwrap();
        assert!(schema.contains_table("customers"));
        assert!(!schema.contains_table("Customers"));
    }

    #[test]
    fn test_find_column_returns_first_owner() {
        let schema = SchemaDescriptor::from_json(CLASSIC_MODELS).unwrap();
        assert_eq!(schema.find_column("customerNumber"), Some("customers"));
        assert_eq!(schema.find_column("status"), Some("orders"));
        assert_eq!(schema.find_column("missing"), None);
    }

    #[test]
    fn test_render_for_prompt_marks_keys() {
        let schema = SchemaDescriptor::from_json(CLASSIC_MODELS).unwrap();
        let rendered = schema.render_for_prompt();
        assert!(rendered.contains("Table: customers"));
        assert!(rendered.contains("    - customerNumber [PRIMARY KEY]"));
        assert!(rendered.contains("    - customerNumber [FK -> customers.customerNumber]"));
    }

    #[test]
    fn test_json_round_trip_keeps_shape() {
        let schema = SchemaDescriptor::new().with_table(
            "t",
            TableSchema::new(["a", "b"]).with_primary_key("a"),
        );
        let json = schema.to_json().unwrap();
        assert_eq!(SchemaDescriptor::from_json(&json).unwrap(), schema);
    }
}
