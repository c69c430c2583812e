use async_trait::async_trait;

use super::DbPool;
use crate::core::error::AgentError;

/// Small durable key/category/value store used to survive restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str, category: &str) -> Result<Option<String>, AgentError>;
    async fn set(&self, key: &str, category: &str, value: &str) -> Result<(), AgentError>;
    async fn delete(&self, key: &str, category: &str) -> Result<(), AgentError>;
}

#[derive(Clone)]
pub struct SqliteKcvStore {
    pool: DbPool,
}

impl SqliteKcvStore {
    /// Wraps `pool`, creating the backing table if needed.
    pub async fn new(pool: DbPool) -> Result<Self, AgentError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kcvstore (
                key TEXT NOT NULL,
                category TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (key, category)
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKcvStore {
    async fn get(&self, key: &str, category: &str) -> Result<Option<String>, AgentError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM kcvstore WHERE key = ? AND category = ?",
        )
        .bind(key)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, category: &str, value: &str) -> Result<(), AgentError> {
        sqlx::query("INSERT OR REPLACE INTO kcvstore (key, category, value) VALUES (?, ?, ?)")
            .bind(key)
            .bind(category)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str, category: &str) -> Result<(), AgentError> {
        sqlx::query("DELETE FROM kcvstore WHERE key = ? AND category = ?")
            .bind(key)
            .bind(category)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
