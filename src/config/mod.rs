use crate::core::error::AgentError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Azure,
}

impl Provider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAI),
            "azure" => Some(Provider::Azure),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Azure => "https://localhost.openai.azure.com",
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Provider::OpenAI
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Some(LogFormat::Compact),
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub provider: Provider,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    pub model: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            endpoint: None,
            api_key: None,
            api_version: "2024-05-01-preview".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl CompletionSettings {
    pub fn base_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub semantic_configuration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub database_url: String,
    pub kcv_store_url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data.db".to_string(),
            kcv_store_url: "sqlite://kcvstore.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub name: String,
    pub instructions: String,
    pub data_folder: Option<PathBuf>,
    pub keep_state: bool,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    pub image_dir: PathBuf,
    pub image_url_prefix: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            name: "Sales Assistant".to_string(),
            instructions: "You are a sales assistant. You can answer questions related to customers, products and orders.".to_string(),
            data_folder: None,
            keep_state: false,
            poll_interval_ms: 5_000,
            max_polls: 120,
            image_dir: PathBuf::from("wwwroot/images"),
            image_url_prefix: "/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Connection and credential settings shared by every component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub search: SearchSettings,
    pub store: StoreSettings,
    pub assistant: AssistantSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    fn config_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join(".agentmux").join("config.yaml")
    }

    /// Loads the YAML file (if any), then `.env`, then the process environment.
    pub fn load() -> Result<Settings, AgentError> {
        let path = Self::config_path();
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_yml::from_str::<Settings>(&contents)
                .map_err(|e| AgentError::Config(format!("Parse {}: {}", path.display(), e)))?
        } else {
            Settings::default()
        };

        dotenvy::dotenv().ok();
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Applies environment-style overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_PROVIDER") {
            self.completion.provider = Provider::from_str(&v)
                .ok_or_else(|| AgentError::Config(format!("Unsupported provider: {}", v)))?;
        }
        if let Some(v) = get("OPENAI_URI") {
            self.completion.endpoint = Some(v);
        }
        if let Some(v) = get("OPENAI_KEY") {
            self.completion.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_VERSION") {
            self.completion.api_version = v;
        }
        if let Some(v) = get("OPENAI_GPT_DEPLOYMENT") {
            self.completion.model = v;
        }

        if let Some(v) = get("AISEARCH_ENDPOINT") {
            self.search.endpoint = Some(v);
        }
        if let Some(v) = get("AISEARCH_APIKEY") {
            self.search.api_key = Some(v);
        }
        if let Some(v) = get("AISEARCH_SEMANTIC_CONFIG") {
            self.search.semantic_configuration = Some(v);
        }

        if let Some(v) = get("CONN_STR") {
            self.store.database_url = v;
        }
        if let Some(v) = get("KCV_STORE_URL") {
            self.store.kcv_store_url = v;
        }

        if let Some(v) = get("ASSISTANT_NAME") {
            self.assistant.name = v;
        }
        if let Some(v) = get("ASSISTANT_INSTRUCTIONS") {
            self.assistant.instructions = v;
        }
        if let Some(v) = get("ASSISTANT_DATA_FOLDER") {
            self.assistant.data_folder = Some(PathBuf::from(v));
        }
        if let Some(v) = get("ASSISTANT_KEEP_STATE") {
            self.assistant.keep_state = parse_value("ASSISTANT_KEEP_STATE", &v)?;
        }
        if let Some(v) = get("ASSISTANT_POLL_INTERVAL_MS") {
            self.assistant.poll_interval_ms = parse_value("ASSISTANT_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("ASSISTANT_MAX_POLLS") {
            self.assistant.max_polls = parse_value("ASSISTANT_MAX_POLLS", &v)?;
        }
        if let Some(v) = get("IMAGE_DIR") {
            self.assistant.image_dir = PathBuf::from(v);
        }
        if let Some(v) = get("IMAGE_URL_PREFIX") {
            self.assistant.image_url_prefix = v;
        }

        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.logging.format = LogFormat::from_str(&v)
                .ok_or_else(|| AgentError::Config(format!("Unsupported log format: {}", v)))?;
        }

        Ok(())
    }

    pub fn require_api_key(&self) -> Result<String, AgentError> {
        self.completion
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("OPENAI_KEY is not set".to_string()))
    }

    pub fn require_search(&self) -> Result<(String, String), AgentError> {
        let endpoint = self
            .search
            .endpoint
            .clone()
            .ok_or_else(|| AgentError::Config("AISEARCH_ENDPOINT is not set".to_string()))?;
        let api_key = self
            .search
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("AISEARCH_APIKEY is not set".to_string()))?;
        Ok((endpoint, api_key))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AgentError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| AgentError::Config(format!("Invalid value for {}: {}", key, value)))
}
