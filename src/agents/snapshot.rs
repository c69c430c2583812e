use crate::core::error::AgentError;
use crate::store::DataStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Supplies prompt context when a handler is asked without any.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn context(&self) -> Result<String, AgentError>;
}

/// Runs a fixed set of statements and renders each result as CSV.
pub struct QuerySnapshot {
    store: Arc<dyn DataStore>,
    statements: Vec<String>,
}

impl QuerySnapshot {
    pub fn new(store: Arc<dyn DataStore>, statements: Vec<String>) -> Self {
        Self { store, statements }
    }
}

#[async_trait]
impl ContextProvider for QuerySnapshot {
    async fn context(&self) -> Result<String, AgentError> {
        let mut sections = Vec::with_capacity(self.statements.len());
        for statement in &self.statements {
            match self.store.execute(statement).await {
                Ok(result) => sections.push(result.to_csv()),
                Err(e) => warn!(statement = %statement, error = %e, "snapshot query failed"),
            }
        }
        Ok(sections.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SqlDataStore, connect_with_settings};

    async fn store() -> Arc<dyn DataStore> {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.unwrap();
        sqlx::query("CREATE TABLE Customers (Name TEXT, Total REAL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO Customers VALUES ('Ada', 10.5), ('Grace', 7.0)")
            .execute(&pool)
            .await
            .unwrap();
        Arc::new(SqlDataStore::new(pool))
    }

    #[tokio::test]
    async fn renders_each_statement_as_csv() {
        let snapshot = QuerySnapshot::new(
            store().await,
            vec!["SELECT Name, Total FROM Customers ORDER BY Name".to_string()],
        );
        let context = snapshot.context().await.unwrap();
        assert!(context.starts_with("Name,Total\n"));
        assert!(context.contains("Ada,10.5"));
        assert!(context.contains("Grace,7"));
    }

    #[tokio::test]
    async fn failing_statements_are_skipped() {
        let snapshot = QuerySnapshot::new(
            store().await,
            vec![
                "SELECT * FROM Missing".to_string(),
                "SELECT Name FROM Customers WHERE Name = 'Ada'".to_string(),
            ],
        );
        assert_eq!(snapshot.context().await.unwrap(), "Name\nAda\n");
    }
}
