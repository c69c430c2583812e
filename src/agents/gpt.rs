use super::message::{ChatMessage, ChatRequest, exchange};
use super::snapshot::ContextProvider;
use super::{Agent, with_context};
use crate::core::error::AgentError;
use crate::providers::{CompletionBackend, CompletionOptions, Message};
use async_trait::async_trait;
use std::sync::Arc;

pub const SYSTEM_PROMPT: &str = "You are an agent that can help answer questions about customers, products, and customer orders.";

/// Plain completion grounded in whatever context text it is handed.
pub struct GptAgent {
    backend: Arc<dyn CompletionBackend>,
    system_prompt: String,
    context_provider: Option<Arc<dyn ContextProvider>>,
}

impl GptAgent {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            system_prompt: SYSTEM_PROMPT.to_string(),
            context_provider: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context_provider = Some(provider);
        self
    }

    /// An attached provider is refreshed on every request and wins over
    /// caller context.
    async fn resolve_context(&self, request: &ChatRequest) -> Result<String, AgentError> {
        match &self.context_provider {
            Some(provider) => provider.context().await,
            None => Ok(request.context.clone().unwrap_or_default()),
        }
    }
}

#[async_trait]
impl Agent for GptAgent {
    async fn process(&self, request: &ChatRequest) -> Result<Vec<ChatMessage>, AgentError> {
        let context = self.resolve_context(request).await?;
        let messages = [
            Message::system(self.system_prompt.clone()),
            Message::user(with_context(&request.input, &context)),
        ];
        let reply = self
            .backend
            .complete(
                &messages,
                &CompletionOptions::new(request.max_tokens, request.temperature),
            )
            .await?;
        Ok(exchange(request, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedBackend;
    use crate::providers::Role;

    struct StaticContext(&'static str);

    #[async_trait]
    impl ContextProvider for StaticContext {
        async fn context(&self) -> Result<String, AgentError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn sends_system_prompt_and_wrapped_context() {
        let backend = Arc::new(ScriptedBackend::replying("Ada spent the most."));
        let agent = GptAgent::new(backend.clone());
        let request = ChatRequest::new("ada", "42", "Who is the top customer?")
            .with_context("Name,Total\nAda,10\n")
            .with_sampling(200, 0.5);

        let messages = agent.process(&request).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Ada spent the most.");
        let calls = backend.calls();
        let (sent, options) = &calls[0];
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[0].content, SYSTEM_PROMPT);
        assert_eq!(
            sent[1].content,
            "Who is the top customer?Text: \"\"\"Name,Total\nAda,10\n\"\"\""
        );
        assert_eq!(*options, CompletionOptions::new(200, 0.5));
    }

    #[tokio::test]
    async fn falls_back_to_the_context_provider() {
        let backend = Arc::new(ScriptedBackend::replying("ok"));
        let agent =
            GptAgent::new(backend.clone()).with_context_provider(Arc::new(StaticContext("csv")));

        agent
            .process(&ChatRequest::new("ada", "42", "q"))
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].0[1].content, "qText: \"\"\"csv\"\"\"");
    }

    #[tokio::test]
    async fn provider_context_replaces_caller_context() {
        let backend = Arc::new(ScriptedBackend::replying("ok"));
        let agent = GptAgent::new(backend.clone())
            .with_context_provider(Arc::new(StaticContext("SNAPSHOT")));

        agent
            .process(&ChatRequest::new("ada", "42", "q").with_context("PIPED"))
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].0[1].content, "qText: \"\"\"SNAPSHOT\"\"\"");
    }

    #[tokio::test]
    async fn completion_errors_propagate() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(AgentError::Api(
            "429: rate limited".to_string(),
        ))]));
        let result = GptAgent::new(backend)
            .process(&ChatRequest::new("ada", "42", "q"))
            .await;
        assert!(matches!(result, Err(AgentError::Api(_))));
    }
}
