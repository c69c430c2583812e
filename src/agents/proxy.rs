use super::classifier::{Classifier, IntentClassifier, OTHER_INTENT, UNKNOWN_INTENT};
use super::message::{ChatMessage, ChatRequest, exchange};
use super::registry::Registry;
use super::Agent;
use crate::core::error::AgentError;
use crate::providers::{CompletionBackend, CompletionOptions, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Entry point for user utterances: classifies each one and delegates to
/// exactly one registered agent, or answers directly when nothing matches.
pub struct AgentProxy {
    backend: Arc<dyn CompletionBackend>,
    classifier: Arc<dyn Classifier>,
    registry: Registry,
}

impl AgentProxy {
    pub fn new(backend: Arc<dyn CompletionBackend>, registry: Registry) -> Self {
        let classifier = Arc::new(IntentClassifier::new(backend.clone()));
        Self::with_classifier(backend, classifier, registry)
    }

    pub fn with_classifier(
        backend: Arc<dyn CompletionBackend>,
        classifier: Arc<dyn Classifier>,
        registry: Registry,
    ) -> Self {
        Self {
            backend,
            classifier,
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    async fn answer_directly(
        &self,
        request: &ChatRequest,
    ) -> Result<Vec<ChatMessage>, AgentError> {
        let reply = self
            .backend
            .complete(
                &[Message::user(request.input.clone())],
                &CompletionOptions::default(),
            )
            .await?;
        Ok(exchange(request, reply))
    }
}

#[async_trait]
impl Agent for AgentProxy {
    #[instrument(skip_all, fields(user_id = %request.user_id))]
    async fn process(&self, request: &ChatRequest) -> Result<Vec<ChatMessage>, AgentError> {
        let intent = self.classifier.classify(&request.input, &self.registry).await;

        let registration = match intent.as_str() {
            OTHER_INTENT | UNKNOWN_INTENT => None,
            label => self.registry.find(label),
        };

        match registration {
            Some(registration) => {
                info!(intent = %registration.intent, "delegating to registered agent");
                registration.agent.process(request).await
            }
            None => {
                info!(intent = %intent, "no registered agent matched, answering directly");
                self.answer_directly(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::classifier::testing::FixedClassifier;
    use crate::agents::message::ChatRole;
    use crate::agents::registry::AgentRegistration;
    use crate::agents::testing::EchoAgent;
    use crate::providers::testing::ScriptedBackend;
    use crate::providers::Role;

    struct Fixture {
        backend: Arc<ScriptedBackend>,
        weather: Arc<EchoAgent>,
        sales: Arc<EchoAgent>,
        proxy: AgentProxy,
    }

    fn fixture(label: &str, replies: Vec<Result<String, AgentError>>) -> Fixture {
        let backend = Arc::new(ScriptedBackend::new(replies));
        let weather = Arc::new(EchoAgent::new("sunny"));
        let sales = Arc::new(EchoAgent::new("12 orders"));
        let registry = Registry::from_registrations(vec![
            AgentRegistration::new("WeatherAgent", "weather questions", weather.clone()).unwrap(),
            AgentRegistration::new("SalesAgent", "sales questions", sales.clone()).unwrap(),
        ])
        .unwrap();
        let proxy = AgentProxy::with_classifier(
            backend.clone(),
            Arc::new(FixedClassifier::new(label)),
            registry,
        );
        Fixture {
            backend,
            weather,
            sales,
            proxy,
        }
    }

    #[tokio::test]
    async fn matched_intent_goes_to_exactly_one_agent() {
        let f = fixture("SalesAgent", vec![]);
        let request = ChatRequest::new("ada", "42", "how many orders?");

        let messages = f.proxy.process(&request).await.unwrap();

        assert_eq!(messages[1].content, "12 orders");
        assert_eq!(f.sales.invocations(), 1);
        assert_eq!(f.weather.invocations(), 0);
        assert!(f.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn other_intent_answers_with_a_plain_completion() {
        let f = fixture(OTHER_INTENT, vec![Ok("Hello there".to_string())]);
        let request = ChatRequest::new("ada", "42", "hello");

        let messages = f.proxy.process(&request).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, "Hello there");
        assert_eq!(f.sales.invocations() + f.weather.invocations(), 0);

        let calls = f.backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.len(), 1);
        assert_eq!(calls[0].0[0].role, Role::User);
        assert_eq!(calls[0].1, CompletionOptions::default());
    }

    #[tokio::test]
    async fn unknown_and_unregistered_labels_fall_back() {
        for label in [UNKNOWN_INTENT, "WeatherAgent.", "Travel"] {
            let f = fixture(label, vec![Ok("fallback".to_string())]);
            let messages = f
                .proxy
                .process(&ChatRequest::new("ada", "42", "hmm"))
                .await
                .unwrap();
            assert_eq!(messages[1].content, "fallback");
            assert_eq!(f.sales.invocations() + f.weather.invocations(), 0);
        }
    }

    #[tokio::test]
    async fn fallback_completion_errors_surface() {
        let f = fixture(OTHER_INTENT, vec![Err(AgentError::Api("500".to_string()))]);
        let result = f.proxy.process(&ChatRequest::new("ada", "42", "hello")).await;
        assert!(matches!(result, Err(AgentError::Api(_))));
    }

    #[tokio::test]
    async fn delegated_request_is_passed_through_unchanged() {
        let f = fixture("WeatherAgent", vec![]);
        let request = ChatRequest::new("ada", "42", "rain?").with_sampling(64, 0.9);

        f.proxy.process(&request).await.unwrap();

        assert_eq!(f.weather.seen.lock().unwrap()[0], request);
    }
}
