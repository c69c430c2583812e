use crate::store::{ColumnDescriptor, QueryResult, Row};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    /// `content` is a relative resource path, not prose.
    Image,
}

/// The uniform output unit of every handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, request: &ChatRequest, content: impl Into<String>) -> Self {
        Self {
            role,
            user_name: request.user_name.clone(),
            user_id: request.user_id.clone(),
            content: content.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn user(request: &ChatRequest, content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, request, content)
    }

    pub fn assistant(request: &ChatRequest, content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, request, content)
    }

    pub fn image(request: &ChatRequest, url: impl Into<String>) -> Self {
        Self::new(ChatRole::Image, request, url)
    }

    /// Attaches the tabular result of an executed statement.
    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.columns = result.columns;
        self.rows = result.rows;
        self
    }
}

/// The `[user, assistant]` pair most handlers answer with.
pub fn exchange(request: &ChatRequest, reply: impl Into<String>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::user(request, request.input.clone()),
        ChatMessage::assistant(request, reply),
    ]
}

fn default_user() -> String {
    "user".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

/// One call into a handler or the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default = "default_user")]
    pub user_name: String,
    #[serde(default = "default_user")]
    pub user_id: String,
    pub input: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Caller-supplied context; handlers with their own context source ignore it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ChatRequest {
    pub fn new(
        user_name: impl Into<String>,
        user_id: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            user_id: user_id.into(),
            input: input.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            context: None,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
