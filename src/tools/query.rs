use super::Tool;
use crate::agents::sql::sanitize_statement;
use crate::core::error::AgentError;
use crate::store::DataStore;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Lets the assistant read from the sales database during a run.
pub struct SqlQueryTool {
    store: Arc<dyn DataStore>,
    schema: String,
}

impl SqlQueryTool {
    pub const NAME: &'static str = "querySalesDatabase";

    pub fn new(store: Arc<dyn DataStore>, schema: impl Into<String>) -> Self {
        Self {
            store,
            schema: schema.into(),
        }
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Runs a single read-only SQL statement against the sales database and returns the rows as CSV."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "statement": {
                    "type": "string",
                    "description": format!("A SQLite SELECT statement over this schema:\n{}", self.schema)
                }
            },
            "required": ["statement"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value, AgentError> {
        let statement = args["statement"]
            .as_str()
            .map(sanitize_statement)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AgentError::ToolExecution("statement is required".to_string()))?;

        let head = statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        if head != "SELECT" && head != "WITH" {
            return Err(AgentError::ToolExecution(format!(
                "only SELECT statements are allowed, got {}",
                head
            )));
        }

        let result = self
            .store
            .execute(&statement)
            .await
            .map_err(|e| AgentError::ToolExecution(e.to_string()))?;
        Ok(Value::String(result.to_csv()))
    }
}
