use crate::agents::assistant::ActionHandler;
use crate::assistants::{
    AssistantsApi, FunctionDefinition, RequiredToolCall, Run, ToolDefinition, ToolOutput,
};
use crate::core::error::AgentError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub mod query;

pub use query::SqlQueryTool;

pub const NO_TOOL_FOUND: &str = "No tool was found for the provided tool call.";

/// A local function the remote assistant may call while a run is in `requires_action`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn call(&self, args: Value) -> Result<Value, AgentError>;
}

#[derive(Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value, AgentError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.call(args).await
    }

    /// One `function` definition per tool, for the assistant's tool list.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition::Function {
                function: FunctionDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect()
    }

    /// Resolves one required call; failures become the output text so the run can go on.
    pub async fn resolve(&self, call: &RequiredToolCall) -> ToolOutput {
        let output = match self.get_tool(&call.function.name) {
            None => {
                warn!(tool = %call.function.name, "assistant requested an unknown tool");
                NO_TOOL_FOUND.to_string()
            }
            Some(tool) => {
                let args = if call.function.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    match serde_json::from_str(&call.function.arguments) {
                        Ok(args) => args,
                        Err(e) => {
                            warn!(tool = %call.function.name, error = %e, "tool arguments are not valid JSON");
                            Value::Object(Default::default())
                        }
                    }
                };
                match tool.call(args).await {
                    Ok(Value::String(s)) => s,
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        warn!(tool = %call.function.name, error = %e, "tool call failed");
                        e.to_string()
                    }
                }
            }
        };

        ToolOutput {
            tool_call_id: call.id.clone(),
            output,
        }
    }
}

#[async_trait]
impl ActionHandler for ToolSet {
    async fn fulfil(&self, api: &dyn AssistantsApi, run: &Run) -> Result<Run, AgentError> {
        let mut outputs = Vec::new();
        for call in run.required_tool_calls() {
            outputs.push(self.resolve(call).await);
        }
        info!(run_id = %run.id, outputs = outputs.len(), "submitting tool outputs");
        api.submit_tool_outputs(&run.thread_id, &run.id, &outputs)
            .await
    }
}
