use super::{CompletionBackend, CompletionOptions, Message, Role};
use crate::config::{CompletionSettings, Provider};
use crate::core::error::AgentError;
use crate::providers::base_client::HttpClient;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatCompletionMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and Azure OpenAI deployments.
#[derive(Clone)]
pub struct OpenAIProvider {
    client: HttpClient,
    flavor: Provider,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_endpoint(
            Provider::OpenAI.default_base_url().to_string(),
            api_key,
            model,
        )
    }

    pub fn with_endpoint(endpoint: String, api_key: String, model: String) -> Self {
        let auth_header = Some(("Authorization".to_string(), format!("Bearer {}", api_key)));
        Self {
            client: HttpClient::new(endpoint, auth_header, None),
            flavor: Provider::OpenAI,
            model,
        }
    }

    pub fn azure(endpoint: &str, api_key: String, api_version: &str, deployment: String) -> Self {
        let base_url = format!("{}/openai", endpoint.trim_end_matches('/'));
        let client = HttpClient::new(base_url, Some(("api-key".to_string(), api_key)), None)
            .with_query_param("api-version", api_version);
        Self {
            client,
            flavor: Provider::Azure,
            model: deployment,
        }
    }

    pub fn from_settings(settings: &CompletionSettings) -> Result<Self, AgentError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("OPENAI_KEY is not set".to_string()))?;
        match settings.provider {
            Provider::OpenAI => Ok(Self::with_endpoint(
                settings.base_url(),
                api_key,
                settings.model.clone(),
            )),
            Provider::Azure => {
                let endpoint = settings.endpoint.as_deref().ok_or_else(|| {
                    AgentError::Config("OPENAI_URI is required for Azure".to_string())
                })?;
                Ok(Self::azure(
                    endpoint,
                    api_key,
                    &settings.api_version,
                    settings.model.clone(),
                ))
            }
        }
    }

    fn completions_path(&self) -> String {
        match self.flavor {
            Provider::OpenAI => "chat/completions".to_string(),
            Provider::Azure => format!("deployments/{}/chat/completions", self.model),
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> ChatCompletionRequest {
        let req_messages = messages
            .iter()
            .map(|m| ChatCompletionMessage {
                role: match m.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect();

        ChatCompletionRequest {
            // Azure routes by deployment in the path.
            model: match self.flavor {
                Provider::OpenAI => Some(self.model.clone()),
                Provider::Azure => None,
            },
            messages: req_messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OpenAIProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, AgentError> {
        let payload = self.build_request(messages, options);

        let response = self.client.post(&self.completions_path(), &payload).await?;

        let response_body: String = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&response_body)?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Api("No choices in API response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_requests_carry_the_model_and_sampling_options() {
        let provider = OpenAIProvider::new("key".to_string(), "gpt-4o".to_string());
        let request = provider.build_request(
            &[Message::system("be brief"), Message::user("hi")],
            &CompletionOptions::new(2, 0.1),
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(provider.completions_path(), "chat/completions");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 2);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn azure_requests_route_by_deployment() {
        let provider = OpenAIProvider::azure(
            "https://contoso.openai.azure.com/",
            "key".to_string(),
            "2024-05-01-preview",
            "gpt-35".to_string(),
        );
        let request = provider.build_request(&[Message::user("hi")], &CompletionOptions::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(provider.completions_path(), "deployments/gpt-35/chat/completions");
        assert!(json.get("model").is_none());
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn azure_without_endpoint_is_a_configuration_error() {
        let settings = CompletionSettings {
            provider: Provider::Azure,
            api_key: Some("key".to_string()),
            ..CompletionSettings::default()
        };
        assert!(matches!(
            OpenAIProvider::from_settings(&settings),
            Err(AgentError::Config(_))
        ));
    }
}
