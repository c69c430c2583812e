use crate::agents::assistant::{AssistantAgent, AssistantBlueprint, AssistantIdentity};
use crate::agents::sql::DEFAULT_SCHEMA;
use crate::agents::{
    AgentProxy, AgentRegistration, GptAgent, QuerySnapshot, RagAgent, Registry, SqlAgent,
};
use crate::assistants::{AssistantsApi, OpenAIAssistantsClient, ToolDefinition};
use crate::config::Settings;
use crate::core::error::AgentError;
use crate::providers::CompletionBackend;
use crate::providers::openai::OpenAIProvider;
use crate::search::{AzureSearchClient, SearchIndex};
use crate::store::{DataStore, KeyValueStore, SqlDataStore, SqliteKcvStore, connect};
use crate::tools::{SqlQueryTool, ToolSet};
use std::sync::Arc;
use tracing::info;

/// Reference data the general chat handler sees when the caller gives no context.
pub const SNAPSHOT_STATEMENTS: [&str; 2] = [
    "SELECT * FROM TopCustomers LIMIT 10",
    "SELECT * FROM TopProductsSold LIMIT 10",
];

/// Collaborators shared by every handler, built once at start-up.
pub struct AppContext {
    pub settings: Settings,
    pub backend: Arc<dyn CompletionBackend>,
    pub assistants: Arc<dyn AssistantsApi>,
    pub data_store: Arc<dyn DataStore>,
    pub search: Option<Arc<dyn SearchIndex>>,
    pub tools: Arc<ToolSet>,
    pub assistant: Arc<AssistantAgent>,
}

impl AppContext {
    pub async fn from_settings(settings: Settings) -> Result<Self, AgentError> {
        settings.require_api_key()?;
        let backend: Arc<dyn CompletionBackend> =
            Arc::new(OpenAIProvider::from_settings(&settings.completion)?);
        let assistants: Arc<dyn AssistantsApi> =
            Arc::new(OpenAIAssistantsClient::from_settings(&settings.completion)?);

        let data_store: Arc<dyn DataStore> =
            Arc::new(SqlDataStore::new(connect(&settings.store.database_url).await?));
        let kcv: Arc<dyn KeyValueStore> =
            Arc::new(SqliteKcvStore::new(connect(&settings.store.kcv_store_url).await?).await?);

        let search: Option<Arc<dyn SearchIndex>> = match settings.require_search() {
            Ok((endpoint, api_key)) => Some(Arc::new(AzureSearchClient::new(
                endpoint,
                api_key,
                settings.search.semantic_configuration.clone(),
            ))),
            Err(e) => {
                info!(reason = %e, "search index not configured, retrieval is disabled");
                None
            }
        };

        Self::assemble(settings, backend, assistants, data_store, Some(kcv), search)
    }

    /// Wires the handlers over already-built collaborators.
    pub fn assemble(
        settings: Settings,
        backend: Arc<dyn CompletionBackend>,
        assistants: Arc<dyn AssistantsApi>,
        data_store: Arc<dyn DataStore>,
        kcv: Option<Arc<dyn KeyValueStore>>,
        search: Option<Arc<dyn SearchIndex>>,
    ) -> Result<Self, AgentError> {
        let mut tools = ToolSet::new();
        tools.add_tool(Arc::new(SqlQueryTool::new(data_store.clone(), DEFAULT_SCHEMA)));
        let tools = Arc::new(tools);

        let mut tool_definitions = vec![ToolDefinition::CodeInterpreter];
        tool_definitions.extend(tools.definitions());
        let blueprint = AssistantBlueprint::new(
            settings.assistant.name.clone(),
            settings.assistant.instructions.clone(),
            settings.completion.model.clone(),
        )?
        .with_tools(tool_definitions)
        .with_data_folder(settings.assistant.data_folder.clone());

        let mut identity = AssistantIdentity::new(assistants.clone(), blueprint);
        if let Some(kcv) = kcv {
            identity = identity.with_kcv(kcv);
        }

        let assistant = Arc::new(
            AssistantAgent::from_settings(
                assistants.clone(),
                Arc::new(identity),
                &settings.assistant,
            )
            .with_action_handler(tools.clone()),
        );

        Ok(Self {
            settings,
            backend,
            assistants,
            data_store,
            search,
            tools,
            assistant,
        })
    }

    pub fn gpt_agent(&self) -> GptAgent {
        let snapshot = QuerySnapshot::new(
            self.data_store.clone(),
            SNAPSHOT_STATEMENTS.iter().map(|s| s.to_string()).collect(),
        );
        GptAgent::new(self.backend.clone()).with_context_provider(Arc::new(snapshot))
    }

    pub fn sql_agent(&self) -> SqlAgent {
        SqlAgent::new(self.backend.clone(), self.data_store.clone())
    }

    pub fn rag_agent(&self) -> Result<RagAgent, AgentError> {
        let index = self.search.clone().ok_or_else(|| {
            AgentError::Config("AISEARCH_ENDPOINT and AISEARCH_APIKEY must be set".to_string())
        })?;
        Ok(RagAgent::new(self.backend.clone(), index))
    }

    /// The dispatcher over every handler this context can build.
    pub fn proxy(&self) -> Result<AgentProxy, AgentError> {
        let mut registry = Registry::new();
        registry.register(AgentRegistration::new(
            "ChatAgent",
            "general questions about customers, products and orders",
            Arc::new(self.gpt_agent()),
        )?)?;
        registry.register(AgentRegistration::new(
            "SQLAgent",
            "questions that require querying the sales database",
            Arc::new(self.sql_agent()),
        )?)?;
        registry.register(AgentRegistration::new(
            "AssistantAgent",
            "requests to create charts, graphs or run calculations",
            self.assistant.clone(),
        )?)?;
        if self.search.is_some() {
            registry.register(AgentRegistration::new(
                "RAGAgent",
                "questions answered from the indexed documents",
                Arc::new(self.rag_agent()?),
            )?)?;
        }
        Ok(AgentProxy::new(self.backend.clone(), registry))
    }

    /// Replaces the remote assistant once in-flight requests have released it.
    pub async fn reset_assistant(&self) -> Result<String, AgentError> {
        self.assistant.identity().reset().await
    }

    pub async fn cleanup(&self) {
        self.assistant.cleanup().await;
    }
}
