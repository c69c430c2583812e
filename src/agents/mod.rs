//! Intent-routed agents. Every handler answers a [`ChatRequest`] with an
//! ordered list of [`ChatMessage`]s; the [`AgentProxy`] picks the handler.

use crate::core::error::AgentError;
use async_trait::async_trait;

pub mod assistant;
pub mod classifier;
pub mod gpt;
pub mod message;
pub mod proxy;
pub mod rag;
pub mod registry;
pub mod snapshot;
pub mod sql;

pub use assistant::{ActionHandler, AssistantAgent, AssistantIdentity};
pub use classifier::{Classifier, IntentClassifier, OTHER_INTENT, UNKNOWN_INTENT};
pub use gpt::GptAgent;
pub use message::{ChatMessage, ChatRequest, ChatRole, exchange};
pub use proxy::AgentProxy;
pub use rag::RagAgent;
pub use registry::{AgentRegistration, Registry};
pub use snapshot::{ContextProvider, QuerySnapshot};
pub use sql::SqlAgent;

#[async_trait]
pub trait Agent: Send + Sync {
    async fn process(&self, request: &ChatRequest) -> Result<Vec<ChatMessage>, AgentError>;
}

/// Wraps caller context in the delimiters the completion prompts expect.
pub(crate) fn with_context(prompt: &str, context: &str) -> String {
    format!("{}Text: \"\"\"{}\"\"\"", prompt, context)
}
