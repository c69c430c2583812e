use super::message::{ChatMessage, ChatRequest, exchange};
use super::{Agent, with_context};
use crate::core::error::AgentError;
use crate::providers::{CompletionBackend, CompletionOptions, Message};
use crate::search::SearchIndex;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 3;

/// Answers from documents retrieved out of the search index.
pub struct RagAgent {
    backend: Arc<dyn CompletionBackend>,
    index: Arc<dyn SearchIndex>,
    top_k: usize,
}

impl RagAgent {
    pub fn new(backend: Arc<dyn CompletionBackend>, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            backend,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl Agent for RagAgent {
    async fn process(&self, request: &ChatRequest) -> Result<Vec<ChatMessage>, AgentError> {
        let results = self.index.search(&request.input, self.top_k).await?;
        debug!(hits = results.len(), "search returned");

        // Only the last hit is kept as context.
        let mut context = request.context.clone().unwrap_or_default();
        for result in &results {
            context = format!("{}\n", result.snippet);
        }

        let reply = self
            .backend
            .complete(
                &[Message::user(with_context(&request.input, &context))],
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
    use crate::search::SearchResult;
    use std::sync::Mutex;

    struct CannedIndex {
        hits: Vec<&'static str>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl CannedIndex {
        fn new(hits: Vec<&'static str>) -> Self {
            Self {
                hits,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchIndex for CannedIndex {
        async fn search(
            &self,
            query: &str,
            top_k: usize,
        ) -> Result<Vec<SearchResult>, AgentError> {
            self.queries.lock().unwrap().push((query.to_string(), top_k));
            Ok(self
                .hits
                .iter()
                .map(|snippet| SearchResult {
                    snippet: snippet.to_string(),
                    ..SearchResult::default()
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn last_snippet_becomes_the_context() {
        let backend = Arc::new(ScriptedBackend::replying("Fifteen days."));
        let index = Arc::new(CannedIndex::new(vec!["A", "B"]));
        let agent = RagAgent::new(backend.clone(), index.clone());

        let messages = agent
            .process(&ChatRequest::new("ada", "42", "How much PTO?"))
            .await
            .unwrap();

        assert_eq!(messages[1].content, "Fifteen days.");
        assert_eq!(
            index.queries.lock().unwrap()[0],
            ("How much PTO?".to_string(), DEFAULT_TOP_K)
        );
        let calls = backend.calls();
        assert_eq!(calls[0].0.len(), 1);
        assert_eq!(calls[0].0[0].role, Role::User);
        assert_eq!(calls[0].0[0].content, "How much PTO?Text: \"\"\"B\n\"\"\"");
    }

    #[tokio::test]
    async fn no_hits_keeps_the_caller_context() {
        let backend = Arc::new(ScriptedBackend::replying("unsure"));
        let agent = RagAgent::new(backend.clone(), Arc::new(CannedIndex::new(vec![])));

        agent
            .process(&ChatRequest::new("ada", "42", "q"))
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].0[0].content, "qText: \"\"\"\"\"\"");
    }
}
