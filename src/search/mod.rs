use crate::config::SearchSettings;
use crate::core::error::AgentError;
use crate::providers::base_client::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const SEARCH_FIELDS: &str = "chunk_id,parent_id,chunk,title";

/// One hit from the search index; `snippet` is the indexed chunk text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "@search.score", default)]
    pub score: f64,
    #[serde(rename = "@search.rerankerScore", default)]
    pub rerank_score: Option<f64>,
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(rename = "chunk", default)]
    pub snippet: String,
    #[serde(default)]
    pub title: String,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, AgentError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search: &'a str,
    vector_queries: Vec<VectorQuery<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    semantic_configuration: Option<&'a str>,
    top: usize,
    query_type: &'static str,
    select: &'static str,
    query_language: &'static str,
}

#[derive(Serialize)]
struct VectorQuery<'a> {
    text: &'a str,
    kind: &'static str,
    k: usize,
    fields: &'static str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchResult>,
}

/// Hybrid (lexical + vector) semantic query against an Azure AI Search index.
#[derive(Clone)]
pub struct AzureSearchClient {
    client: HttpClient,
    semantic_configuration: Option<String>,
}

impl AzureSearchClient {
    /// `endpoint` is the full `.../docs/search?api-version=...` URL of the index.
    pub fn new(endpoint: String, api_key: String, semantic_configuration: Option<String>) -> Self {
        Self {
            client: HttpClient::new(endpoint, Some(("api-key".to_string(), api_key)), None),
            semantic_configuration,
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Result<Self, AgentError> {
        let endpoint = settings
            .endpoint
            .clone()
            .ok_or_else(|| AgentError::Config("AISEARCH_ENDPOINT is not set".to_string()))?;
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("AISEARCH_APIKEY is not set".to_string()))?;
        Ok(Self::new(
            endpoint,
            api_key,
            settings.semantic_configuration.clone(),
        ))
    }

    fn build_request<'a>(&'a self, query: &'a str, top_k: usize) -> SearchRequest<'a> {
        SearchRequest {
            search: query,
            vector_queries: vec![VectorQuery {
                text: query,
                kind: "text",
                k: top_k,
                fields: "vector",
            }],
            semantic_configuration: self.semantic_configuration.as_deref(),
            top: top_k,
            query_type: "semantic",
            select: SEARCH_FIELDS,
            query_language: "en-US",
        }
    }
}

#[async_trait]
impl SearchIndex for AzureSearchClient {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, AgentError> {
        let payload = self.build_request(query, top_k);
        let response = self
            .client
            .post("", &payload)
            .await
            .map_err(|e| AgentError::Search(e.to_string()))?;
        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)?;
        Ok(parsed.value)
    }
}
