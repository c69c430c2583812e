use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Row, Statement, ValueRef};
use tracing::debug;

use super::{ColumnDescriptor, DataStore, DbPool, QueryResult};
use crate::core::error::AgentError;

/// `DataStore` over a sqlx SQLite pool; column metadata comes from the prepared statement.
#[derive(Clone)]
pub struct SqlDataStore {
    pool: DbPool,
}

impl SqlDataStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl DataStore for SqlDataStore {
    async fn execute(&self, statement: &str) -> Result<QueryResult, AgentError> {
        let prepared = (&self.pool).prepare(statement).await?;
        let columns: Vec<ColumnDescriptor> = prepared
            .columns()
            .iter()
            .map(|c| ColumnDescriptor::new(c.name()))
            .collect();

        let records = prepared.query().fetch_all(&self.pool).await?;
        let rows = records
            .iter()
            .map(|record| (0..columns.len()).map(|i| decode_value(record, i)).collect())
            .collect::<Vec<_>>();

        debug!(columns = columns.len(), rows = rows.len(), "statement executed");
        Ok(QueryResult { columns, rows })
    }
}

fn decode_value(record: &SqliteRow, index: usize) -> Value {
    match record.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }
    if let Ok(v) = record.try_get::<i64, _>(index) {
        return Value::from(v);
    }
    if let Ok(v) = record.try_get::<f64, _>(index) {
        return serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = record.try_get::<String, _>(index) {
        return Value::String(v);
    }
    if let Ok(v) = record.try_get::<Vec<u8>, _>(index) {
        return Value::String(String::from_utf8_lossy(&v).into_owned());
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::connect_with_settings;
    use serde_json::json;

    async fn seeded_store() -> SqlDataStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("connect");
        sqlx::query("CREATE TABLE customers (id INTEGER, name TEXT, total REAL)")
            .execute(&pool)
            .await
            .expect("create");
        sqlx::query(
            "INSERT INTO customers VALUES (1, 'Contoso', 120.5), (2, 'Fabrikam', NULL)",
        )
        .execute(&pool)
        .await
        .expect("insert");
        SqlDataStore::new(pool)
    }

    #[tokio::test]
    async fn execute_returns_columns_in_field_order() {
        let store = seeded_store().await;
        let result = store
            .execute("SELECT name, id FROM customers ORDER BY id")
            .await
            .expect("execute");

        let keys: Vec<_> = result.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "id"]);
        assert_eq!(
            result.rows,
            vec![vec![json!("Contoso"), json!(1)], vec![json!("Fabrikam"), json!(2)]]
        );
    }

    #[tokio::test]
    async fn nulls_and_reals_decode_to_json() {
        let store = seeded_store().await;
        let result = store
            .execute("SELECT total FROM customers ORDER BY id")
            .await
            .expect("execute");

        assert_eq!(result.rows, vec![vec![json!(120.5)], vec![Value::Null]]);
    }

    #[tokio::test]
    async fn empty_result_sets_still_describe_their_columns() {
        let store = seeded_store().await;
        let result = store
            .execute("SELECT id FROM customers WHERE id > 100")
            .await
            .expect("execute");

        assert_eq!(result.columns, vec![ColumnDescriptor::new("id")]);
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn malformed_statements_are_errors() {
        let store = seeded_store().await;
        let err = store.execute("SELEC nothing").await.unwrap_err();
        assert!(matches!(err, AgentError::Database(_)));
    }
}
