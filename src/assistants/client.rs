use super::types::{AssistantSpec, FileObject, Run, ThreadMessage, ToolDefinition, ToolOutput};
use super::AssistantsApi;
use crate::config::{CompletionSettings, Provider};
use crate::core::error::AgentError;
use crate::providers::base_client::HttpClient;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;

#[derive(Serialize)]
struct CreateAssistantRequest<'a> {
    name: &'a str,
    instructions: &'a str,
    model: &'a str,
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_resources: Option<Value>,
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<&'a str>,
}

#[derive(Serialize)]
struct SubmitToolOutputsRequest<'a> {
    tool_outputs: &'a [ToolOutput],
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// REST client for the `/assistants`, `/threads` and `/files` resources.
#[derive(Clone)]
pub struct OpenAIAssistantsClient {
    client: HttpClient,
}

impl OpenAIAssistantsClient {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &CompletionSettings) -> Result<Self, AgentError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("OPENAI_KEY is not set".to_string()))?;
        let mut extra_headers = HashMap::new();
        extra_headers.insert("OpenAI-Beta".to_string(), "assistants=v2".to_string());

        let client = match settings.provider {
            Provider::OpenAI => HttpClient::new(
                settings.base_url(),
                Some(("Authorization".to_string(), format!("Bearer {}", api_key))),
                Some(extra_headers),
            ),
            Provider::Azure => {
                let endpoint = settings.endpoint.as_deref().ok_or_else(|| {
                    AgentError::Config("OPENAI_URI is required for Azure".to_string())
                })?;
                HttpClient::new(
                    format!("{}/openai", endpoint.trim_end_matches('/')),
                    Some(("api-key".to_string(), api_key)),
                    Some(extra_headers),
                )
                .with_query_param("api-version", &settings.api_version)
            }
        };
        Ok(Self::new(client))
    }
}

fn tool_resources(file_ids: &[String]) -> Option<Value> {
    if file_ids.is_empty() {
        None
    } else {
        Some(json!({ "code_interpreter": { "file_ids": file_ids } }))
    }
}

#[async_trait]
impl AssistantsApi for OpenAIAssistantsClient {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, AgentError> {
        let payload = CreateAssistantRequest {
            name: &spec.name,
            instructions: &spec.instructions,
            model: &spec.model,
            tools: &spec.tools,
            tool_resources: tool_resources(&spec.file_ids),
        };
        let created: IdOnly = self.client.post("assistants", &payload).await?.json().await?;
        Ok(created.id)
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<(), AgentError> {
        self.client
            .delete(&format!("assistants/{}", assistant_id))
            .await?;
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<FileObject, AgentError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(file_name));
        let file: FileObject = self.client.post_multipart("files", form).await?.json().await?;
        Ok(file)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), AgentError> {
        self.client.delete(&format!("files/{}", file_id)).await?;
        Ok(())
    }

    async fn file_content(&self, file_id: &str) -> Result<Vec<u8>, AgentError> {
        let response = self
            .client
            .get(&format!("files/{}/content", file_id))
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn create_thread(&self) -> Result<String, AgentError> {
        let created: IdOnly = self.client.post("threads", &json!({})).await?.json().await?;
        Ok(created.id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), AgentError> {
        self.client.delete(&format!("threads/{}", thread_id)).await?;
        Ok(())
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AgentError> {
        let payload = CreateMessageRequest {
            role: "user",
            content,
        };
        self.client
            .post(&format!("threads/{}/messages", thread_id), &payload)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AgentError> {
        let list: ListResponse<ThreadMessage> = self
            .client
            .get(&format!("threads/{}/messages?order=desc&limit=100", thread_id))
            .await?
            .json()
            .await?;
        Ok(list.data)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<Run, AgentError> {
        let payload = CreateRunRequest {
            assistant_id,
            additional_instructions,
        };
        let run = self
            .client
            .post(&format!("threads/{}/runs", thread_id), &payload)
            .await?
            .json()
            .await?;
        Ok(run)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentError> {
        let run = self
            .client
            .get(&format!("threads/{}/runs/{}", thread_id, run_id))
            .await?
            .json()
            .await?;
        Ok(run)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AgentError> {
        let payload = SubmitToolOutputsRequest {
            tool_outputs: outputs,
        };
        let run = self
            .client
            .post(
                &format!("threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
                &payload,
            )
            .await?
            .json()
            .await?;
        Ok(run)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentError> {
        let run = self
            .client
            .post(
                &format!("threads/{}/runs/{}/cancel", thread_id, run_id),
                &json!({}),
            )
            .await?
            .json()
            .await?;
        Ok(run)
    }
}
