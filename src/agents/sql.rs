use super::message::{ChatMessage, ChatRequest};
use super::Agent;
use crate::core::error::AgentError;
use crate::providers::{CompletionBackend, CompletionOptions, Message};
use crate::store::{DataStore, QueryResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "You are an agent that can help generate sql statements based on the schema provided. Here is the schema:\n";

/// Schema of the bundled sales database, with worked examples.
pub const DEFAULT_SCHEMA: &str = r#"Table Customers, columns = [CustomerID, FirstName, LastName, CompanyName, EmailAddress, City, StateProvince, CountryRegion]
Table Products, columns = [ProductID, Name, ProductNumber, Color, ListPrice, Size, Weight, Category, Model]
Table Orders, columns = [OrderID, CustomerID, OrderDate, ShipDate, Status, SubTotal, TaxAmt, Freight, TotalDue]
Table OrderDetails, columns = [OrderID, OrderDetailID, ProductID, OrderQty, UnitPrice, UnitPriceDiscount, LineTotal]
View TopCustomers, columns = [CustomerID, FirstName, LastName, CompanyName, City, StateProvince, CountryRegion, Total]
View TopProductsSold, columns = [ProductID, Name, Category, Model, TotalQty]

Example: What are the top 10 customers?
SELECT FirstName, LastName, CompanyName, Total FROM TopCustomers ORDER BY Total DESC LIMIT 10

Example: How many orders were placed in 2008?
SELECT COUNT(*) AS Orders FROM Orders WHERE strftime('%Y', OrderDate) = '2008'

Example: Which products in the Helmets category sold the most units?
SELECT Name, TotalQty FROM TopProductsSold WHERE Category = 'Helmets' ORDER BY TotalQty DESC
"#;

/// Turns a question into a statement, runs it, and returns both.
pub struct SqlAgent {
    backend: Arc<dyn CompletionBackend>,
    store: Arc<dyn DataStore>,
    schema: String,
}

impl SqlAgent {
    pub fn new(backend: Arc<dyn CompletionBackend>, store: Arc<dyn DataStore>) -> Self {
        Self {
            backend,
            store,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    async fn run(&self, statement: &str) -> QueryResult {
        if statement.is_empty() {
            warn!("model produced no statement");
            return QueryResult::default();
        }
        match self.store.execute(statement).await {
            Ok(result) => result,
            Err(e) => {
                warn!(statement = %statement, error = %e, "generated statement failed");
                QueryResult::default()
            }
        }
    }
}

/// Strips code fences, the leading language tag, line breaks and trailing
/// terminators from model output. Applying it twice changes nothing.
pub fn sanitize_statement(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(input: &str) -> String {
    let unfenced = input.replace("```", "").replace(['\r', '\n'], " ");
    strip_language_tag(&unfenced)
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string()
}

fn strip_language_tag(s: &str) -> &str {
    let trimmed = s.trim_start();
    match trimmed.get(..3) {
        Some(tag)
            if tag.eq_ignore_ascii_case("sql")
                && trimmed[3..]
                    .chars()
                    .next()
                    .is_none_or(|c| !(c.is_alphanumeric() || c == '_')) =>
        {
            &trimmed[3..]
        }
        _ => trimmed,
    }
}

#[async_trait]
impl Agent for SqlAgent {
    async fn process(&self, request: &ChatRequest) -> Result<Vec<ChatMessage>, AgentError> {
        let schema = request.context.as_deref().unwrap_or(&self.schema);
        let messages = [
            Message::system(format!("{}{}", SYSTEM_PROMPT, schema)),
            Message::user(format!(
                "What is the SQL statement to:\n{}\nOutput the SQL statement ONLY.",
                request.input
            )),
        ];
        let raw = self
            .backend
            .complete(
                &messages,
                &CompletionOptions::new(request.max_tokens, request.temperature),
            )
            .await?;

        let statement = sanitize_statement(&raw);
        debug!(statement = %statement, "generated statement");
        let result = self.run(&statement).await;

        Ok(vec![
            ChatMessage::user(request, request.input.clone()),
            ChatMessage::assistant(request, statement).with_result(result),
        ])
    }
}
