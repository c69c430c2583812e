use super::registry::Registry;
use crate::providers::{CompletionBackend, CompletionOptions, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Label returned when classification cannot produce an answer.
pub const UNKNOWN_INTENT: &str = "Unknown";
/// Catch-all label always offered to the model next to the registered ones.
pub const OTHER_INTENT: &str = "OtherAgent";

/// Registered labels span a few tokens each ("RAGAgent" is three).
pub const LABEL_TOKEN_BUDGET: u32 = 8;
pub const CLASSIFIER_TEMPERATURE: f32 = 0.1;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Never fails: unusable answers come back as [`UNKNOWN_INTENT`].
    async fn classify(&self, utterance: &str, registry: &Registry) -> String;
}

pub fn build_prompt(utterance: &str, registry: &Registry) -> String {
    let intents: String = registry
        .iter()
        .map(|r| format!("{}: {}\n", r.intent, r.intent_desc))
        .collect();

    format!(
        "system:\n\
         You are an agent that can determine intent from the following list of intents and return the intent that best matches the user's question or statement.\n\
         \n\
         List of intents:\n\
         {intents}{other}: any other question\n\
         \n\
         user:\n\
         {utterance}\n\
         \n\
         Output in intent ONLY.",
        intents = intents,
        other = OTHER_INTENT,
        utterance = utterance,
    )
}

/// Asks the completion backend to pick one of the registered labels.
pub struct IntentClassifier {
    backend: Arc<dyn CompletionBackend>,
    options: CompletionOptions,
}

impl IntentClassifier {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            options: CompletionOptions::new(LABEL_TOKEN_BUDGET, CLASSIFIER_TEMPERATURE),
        }
    }
}

#[async_trait]
impl Classifier for IntentClassifier {
    async fn classify(&self, utterance: &str, registry: &Registry) -> String {
        let prompt = build_prompt(utterance, registry);
        match self
            .backend
            .complete(&[Message::user(prompt)], &self.options)
            .await
        {
            Ok(label) if !label.trim().is_empty() => {
                debug!(intent = %label, "classified utterance");
                label
            }
            Ok(_) => {
                warn!("classifier returned an empty label");
                UNKNOWN_INTENT.to_string()
            }
            Err(e) => {
                warn!(error = %e, "intent classification failed");
                UNKNOWN_INTENT.to_string()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns the same label for every utterance.
    pub struct FixedClassifier(pub String);

    impl FixedClassifier {
        pub fn new(label: &str) -> Self {
            Self(label.to_string())
        }
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _utterance: &str, _registry: &Registry) -> String {
            self.0.clone()
        }
    }
}
