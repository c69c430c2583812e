use crate::core::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod connection;
pub mod kcv;
pub mod sql;

pub use connection::{DbPool, connect, connect_with_settings};
pub use kcv::{KeyValueStore, SqliteKcvStore};
pub use sql::SqlDataStore;

/// Describes one field of a result set, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub name: String,
    pub resizable: bool,
}

impl ColumnDescriptor {
    pub fn new(field: &str) -> Self {
        Self {
            key: field.to_string(),
            name: field.to_string(),
            resizable: true,
        }
    }
}

/// One record, values positioned like the result-set columns.
pub type Row = Vec<Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Header line plus one comma-separated line per row.
    pub fn to_csv(&self) -> String {
        let mut out = self
            .columns
            .iter()
            .map(|c| c.key.as_str())
            .collect::<Vec<_>>()
            .join(",");
        out.push('\n');
        for row in &self.rows {
            let line = row.iter().map(csv_field).collect::<Vec<_>>().join(",");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if s.contains(',') || s.contains('"') || s.contains('\n') => {
            format!("\"{}\"", s.replace('"', "\"\""))
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Relational data store the structured-query handler runs generated statements against.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn execute(&self, statement: &str) -> Result<QueryResult, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_rendering_quotes_only_when_needed() {
        let result = QueryResult {
            columns: vec![ColumnDescriptor::new("Name"), ColumnDescriptor::new("Total")],
            rows: vec![
                vec![json!("Contoso"), json!(12.5)],
                vec![json!("Fabrikam, Inc."), Value::Null],
            ],
        };

        assert_eq!(
            result.to_csv(),
            "Name,Total\nContoso,12.5\n\"Fabrikam, Inc.\",\n"
        );
    }

    #[test]
    fn column_descriptors_use_the_field_name_for_key_and_display() {
        let column = ColumnDescriptor::new("CustomerID");
        assert_eq!(column.key, "CustomerID");
        assert_eq!(column.name, "CustomerID");
        assert!(column.resizable);
    }
}
