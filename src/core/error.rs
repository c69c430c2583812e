use std::io;
use thiserror::Error;

/// Every failure a handler, collaborator client or the `amux` front end can report.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Non-success reply from the completion, assistant or search service
    #[error("API error: {0}")]
    Api(String),

    /// Missing labels, credentials or endpoints, caught before any request is made
    #[error("Configuration error: {0}")]
    Config(String),

    /// Empty utterance or unreadable piped context
    #[error("Input error: {0}")]
    Input(String),

    /// Data-folder uploads and generated image writes
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Malformed wire payloads or config files
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Transport failures before a service answered
    #[error("Network error: {0}")]
    Network(String),

    /// Sales database or key-value store failures
    #[error("Database error: {0}")]
    Database(String),

    /// Retrieval index failures
    #[error("Search error: {0}")]
    Search(String),

    /// Anything without a better home
    #[error("Unknown error: {0}")]
    Unknown(String),

    /// The assistant asked for a function no tool provides
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A local tool rejected its arguments or failed while running
    #[error("Tool execution error: {0}")]
    ToolExecution(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            AgentError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            AgentError::Api(format!("API returned error status: {}", err))
        } else {
            AgentError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for AgentError {
    fn from(err: serde_yml::Error) -> Self {
        AgentError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<sqlx::Error> for AgentError {
    fn from(err: sqlx::Error) -> Self {
        AgentError::Database(err.to_string())
    }
}

impl From<String> for AgentError {
    fn from(err: String) -> Self {
        AgentError::Unknown(err)
    }
}

impl From<&str> for AgentError {
    fn from(err: &str) -> Self {
        AgentError::Unknown(err.to_string())
    }
}
