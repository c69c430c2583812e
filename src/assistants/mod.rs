//! Remote assistant service: a persistent assistant identity, ephemeral
//! threads, runs over those threads, and the file store behind them.

use crate::core::error::AgentError;
use async_trait::async_trait;
use std::path::Path;

pub mod client;
pub mod types;

pub use client::OpenAIAssistantsClient;
pub use types::{
    Annotation, AssistantSpec, FileObject, FileRef, FunctionCall, FunctionDefinition,
    MessageContent, RequiredToolCall, Run, RunStatus, TextContent, ThreadMessage, ToolDefinition,
    ToolOutput,
};

#[async_trait]
pub trait AssistantsApi: Send + Sync {
    /// Creates the remote identity and returns its id.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, AgentError>;
    async fn delete_assistant(&self, assistant_id: &str) -> Result<(), AgentError>;

    async fn upload_file(&self, path: &Path) -> Result<FileObject, AgentError>;
    async fn delete_file(&self, file_id: &str) -> Result<(), AgentError>;
    async fn file_content(&self, file_id: &str) -> Result<Vec<u8>, AgentError>;

    async fn create_thread(&self) -> Result<String, AgentError>;
    async fn delete_thread(&self, thread_id: &str) -> Result<(), AgentError>;
    /// Appends a user turn to the thread.
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AgentError>;
    /// Thread messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AgentError>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<Run, AgentError>;
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentError>;
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AgentError>;
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    pub fn run_with(status: RunStatus) -> Run {
        Run {
            id: "run_1".to_string(),
            thread_id: "thread_1".to_string(),
            status,
            required_action: None,
            last_error: None,
        }
    }

    /// In-memory stand-in for the assistant service. Every call is logged as
    /// `operation` or `operation:argument`.
    #[derive(Default)]
    pub struct FakeAssistants {
        pub statuses: Mutex<VecDeque<RunStatus>>,
        pub messages: Mutex<Vec<ThreadMessage>>,
        pub files: Mutex<HashMap<String, Vec<u8>>>,
        pub failing: Mutex<Vec<&'static str>>,
        log: Mutex<Vec<String>>,
        ids: Mutex<u32>,
    }

    impl FakeAssistants {
        pub fn with_statuses(statuses: Vec<RunStatus>) -> Self {
            let fake = Self::default();
            *fake.statuses.lock().unwrap() = statuses.into();
            fake
        }

        /// Makes every later call to `operation` fail.
        pub fn fail_on(&self, operation: &'static str) {
            self.failing.lock().unwrap().push(operation);
        }

        pub fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        pub fn count(&self, operation: &str) -> usize {
            self.log()
                .iter()
                .filter(|entry| entry.split(':').next() == Some(operation))
                .count()
        }

        fn record(&self, operation: &'static str, argument: &str) -> Result<(), AgentError> {
            let entry = if argument.is_empty() {
                operation.to_string()
            } else {
                format!("{}:{}", operation, argument)
            };
            self.log.lock().unwrap().push(entry);
            if self.failing.lock().unwrap().contains(&operation) {
                return Err(AgentError::Api(format!("500: {} failed", operation)));
            }
            Ok(())
        }

        fn next_id(&self, prefix: &str) -> String {
            let mut ids = self.ids.lock().unwrap();
            *ids += 1;
            format!("{}_{}", prefix, ids)
        }
    }

    #[async_trait]
    impl AssistantsApi for FakeAssistants {
        async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, AgentError> {
            self.record("create_assistant", &spec.file_ids.join(","))?;
            Ok(self.next_id("asst"))
        }

        async fn delete_assistant(&self, assistant_id: &str) -> Result<(), AgentError> {
            self.record("delete_assistant", assistant_id)
        }

        async fn upload_file(&self, path: &Path) -> Result<FileObject, AgentError> {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.record("upload_file", &filename)?;
            Ok(FileObject {
                id: self.next_id("file"),
                filename,
            })
        }

        async fn delete_file(&self, file_id: &str) -> Result<(), AgentError> {
            self.record("delete_file", file_id)
        }

        async fn file_content(&self, file_id: &str) -> Result<Vec<u8>, AgentError> {
            self.record("file_content", file_id)?;
            self.files
                .lock()
                .unwrap()
                .get(file_id)
                .cloned()
                .ok_or_else(|| AgentError::Api(format!("404: no file {}", file_id)))
        }

        async fn create_thread(&self) -> Result<String, AgentError> {
            self.record("create_thread", "")?;
            Ok("thread_1".to_string())
        }

        async fn delete_thread(&self, thread_id: &str) -> Result<(), AgentError> {
            self.record("delete_thread", thread_id)
        }

        async fn add_message(&self, thread_id: &str, _content: &str) -> Result<(), AgentError> {
            self.record("add_message", thread_id)
        }

        async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AgentError> {
            self.record("list_messages", thread_id)?;
            Ok(self.messages.lock().unwrap().clone())
        }

        async fn create_run(
            &self,
            thread_id: &str,
            assistant_id: &str,
            _additional_instructions: Option<&str>,
        ) -> Result<Run, AgentError> {
            self.record("create_run", assistant_id)?;
            let mut run = run_with(RunStatus::Queued);
            run.thread_id = thread_id.to_string();
            Ok(run)
        }

        async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentError> {
            self.record("retrieve_run", run_id)?;
            let status = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(RunStatus::InProgress);
            let mut run = run_with(status);
            run.thread_id = thread_id.to_string();
            Ok(run)
        }

        async fn submit_tool_outputs(
            &self,
            thread_id: &str,
            run_id: &str,
            outputs: &[ToolOutput],
        ) -> Result<Run, AgentError> {
            self.record("submit_tool_outputs", &outputs.len().to_string())?;
            let mut run = run_with(RunStatus::Queued);
            run.id = run_id.to_string();
            run.thread_id = thread_id.to_string();
            Ok(run)
        }

        async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentError> {
            self.record("cancel_run", run_id)?;
            let mut run = run_with(RunStatus::Cancelling);
            run.thread_id = thread_id.to_string();
            Ok(run)
        }
    }
}
