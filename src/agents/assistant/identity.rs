use crate::assistants::{AssistantSpec, AssistantsApi, ToolDefinition};
use crate::core::error::AgentError;
use crate::store::KeyValueStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{info, warn};

const KCV_KEY: &str = "assistant";
const ID_CATEGORY: &str = "id";
const FILES_CATEGORY: &str = "files";

/// How to build the remote assistant when none exists yet.
#[derive(Debug, Clone)]
pub struct AssistantBlueprint {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<ToolDefinition>,
    pub data_folder: Option<PathBuf>,
}

impl AssistantBlueprint {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AgentError> {
        let name = name.into();
        let instructions = instructions.into();
        if name.trim().is_empty() {
            return Err(AgentError::Config("assistant name is missing".to_string()));
        }
        if instructions.trim().is_empty() {
            return Err(AgentError::Config(
                "assistant instructions are missing".to_string(),
            ));
        }
        Ok(Self {
            name,
            instructions,
            model: model.into(),
            tools: Vec::new(),
            data_folder: None,
        })
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_data_folder(mut self, folder: Option<PathBuf>) -> Self {
        self.data_folder = folder;
        self
    }

    fn tools_or_default(&self) -> Vec<ToolDefinition> {
        if self.tools.is_empty() {
            vec![ToolDefinition::CodeInterpreter]
        } else {
            self.tools.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityState {
    pub assistant_id: String,
    pub file_ids: Vec<String>,
}

/// The one remote assistant shared by every request. Created lazily,
/// remembered in the key-category-value store, and replaced only while no
/// request holds it.
pub struct AssistantIdentity {
    api: Arc<dyn AssistantsApi>,
    blueprint: AssistantBlueprint,
    kcv: Option<Arc<dyn KeyValueStore>>,
    state: RwLock<Option<IdentityState>>,
}

impl AssistantIdentity {
    pub fn new(api: Arc<dyn AssistantsApi>, blueprint: AssistantBlueprint) -> Self {
        Self {
            api,
            blueprint,
            kcv: None,
            state: RwLock::new(None),
        }
    }

    pub fn with_kcv(mut self, kcv: Arc<dyn KeyValueStore>) -> Self {
        self.kcv = Some(kcv);
        self
    }

    /// Reuses an assistant that already exists remotely.
    pub fn with_existing(mut self, assistant_id: impl Into<String>) -> Self {
        self.state = RwLock::new(Some(IdentityState {
            assistant_id: assistant_id.into(),
            file_ids: Vec::new(),
        }));
        self
    }

    /// Shared access to the identity, creating it first if needed. Holding the
    /// guard keeps [`reset`](Self::reset) and [`cleanup`](Self::cleanup) waiting.
    pub async fn acquire(&self) -> Result<RwLockReadGuard<'_, IdentityState>, AgentError> {
        {
            let guard = self.state.read().await;
            if guard.is_some() {
                return settled(guard);
            }
        }

        let mut guard = self.state.write().await;
        if guard.is_none() {
            let state = match self.load().await {
                Some(state) => state,
                None => {
                    let state = self.create().await?;
                    self.persist(&state).await;
                    state
                }
            };
            *guard = Some(state);
        }
        settled(guard.downgrade())
    }

    pub async fn current(&self) -> Option<IdentityState> {
        self.state.read().await.clone()
    }

    /// Deletes the current assistant and its files and creates a fresh one.
    pub async fn reset(&self) -> Result<String, AgentError> {
        let mut guard = self.state.write().await;
        if let Some(old) = guard.take() {
            self.release(&old).await;
        }
        let state = self.create().await?;
        self.persist(&state).await;
        let id = state.assistant_id.clone();
        *guard = Some(state);
        info!(assistant_id = %id, "assistant identity reset");
        Ok(id)
    }

    /// Best-effort removal of the assistant, its files and the stored ids.
    pub async fn cleanup(&self) {
        let mut guard = self.state.write().await;
        let state = match guard.take() {
            Some(state) => Some(state),
            None => self.load().await,
        };
        if let Some(state) = state {
            self.release(&state).await;
        }
        if let Some(kcv) = &self.kcv {
            for category in [ID_CATEGORY, FILES_CATEGORY] {
                if let Err(e) = kcv.delete(KCV_KEY, category).await {
                    warn!(category, error = %e, "failed to clear stored assistant entry");
                }
            }
        }
    }

    async fn load(&self) -> Option<IdentityState> {
        let kcv = self.kcv.as_ref()?;
        let assistant_id = match kcv.get(KCV_KEY, ID_CATEGORY).await {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "could not read stored assistant id");
                return None;
            }
        };
        let file_ids = match kcv.get(KCV_KEY, FILES_CATEGORY).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(error = %e, "stored assistant files are not valid JSON");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "could not read stored assistant files");
                Vec::new()
            }
        };
        info!(assistant_id = %assistant_id, "reusing stored assistant");
        Some(IdentityState {
            assistant_id,
            file_ids,
        })
    }

    async fn create(&self) -> Result<IdentityState, AgentError> {
        let file_ids = match &self.blueprint.data_folder {
            Some(folder) => self.upload_folder(folder).await?,
            None => Vec::new(),
        };

        let spec = AssistantSpec {
            name: self.blueprint.name.clone(),
            instructions: self.blueprint.instructions.clone(),
            model: self.blueprint.model.clone(),
            tools: self.blueprint.tools_or_default(),
            file_ids: file_ids.clone(),
        };
        match self.api.create_assistant(&spec).await {
            Ok(assistant_id) => {
                info!(assistant_id = %assistant_id, files = file_ids.len(), "created assistant");
                Ok(IdentityState {
                    assistant_id,
                    file_ids,
                })
            }
            Err(e) => {
                self.delete_files(&file_ids).await;
                Err(e)
            }
        }
    }

    async fn upload_folder(&self, folder: &Path) -> Result<Vec<String>, AgentError> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut file_ids = Vec::with_capacity(paths.len());
        for path in &paths {
            match self.api.upload_file(path).await {
                Ok(file) => file_ids.push(file.id),
                Err(e) => {
                    self.delete_files(&file_ids).await;
                    return Err(e);
                }
            }
        }
        Ok(file_ids)
    }

    async fn persist(&self, state: &IdentityState) {
        let Some(kcv) = &self.kcv else {
            return;
        };
        if let Err(e) = kcv.set(KCV_KEY, ID_CATEGORY, &state.assistant_id).await {
            warn!(error = %e, "could not store assistant id");
        }
        match serde_json::to_string(&state.file_ids) {
            Ok(json) => {
                if let Err(e) = kcv.set(KCV_KEY, FILES_CATEGORY, &json).await {
                    warn!(error = %e, "could not store assistant files");
                }
            }
            Err(e) => warn!(error = %e, "could not encode assistant files"),
        }
    }

    async fn release(&self, state: &IdentityState) {
        if let Err(e) = self.api.delete_assistant(&state.assistant_id).await {
            warn!(assistant_id = %state.assistant_id, error = %e, "failed to delete assistant");
        }
        self.delete_files(&state.file_ids).await;
    }

    async fn delete_files(&self, file_ids: &[String]) {
        for file_id in file_ids {
            if let Err(e) = self.api.delete_file(file_id).await {
                warn!(file_id = %file_id, error = %e, "failed to delete file");
            }
        }
    }
}

fn settled(
    guard: RwLockReadGuard<'_, Option<IdentityState>>,
) -> Result<RwLockReadGuard<'_, IdentityState>, AgentError> {
    RwLockReadGuard::try_map(guard, |state| state.as_ref())
        .map_err(|_| AgentError::Unknown("assistant identity is not initialised".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistants::testing::FakeAssistants;
    use crate::store::{SqliteKcvStore, connect_with_settings};

    fn blueprint() -> AssistantBlueprint {
        AssistantBlueprint::new("Sales Assistant", "Answer sales questions.", "gpt-4o-mini").unwrap()
    }

    async fn kcv() -> Arc<dyn KeyValueStore> {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.unwrap();
        Arc::new(SqliteKcvStore::new(pool).await.unwrap())
    }

    #[test]
    fn blueprint_requires_name_and_instructions() {
        assert!(AssistantBlueprint::new("", "x", "m").is_err());
        assert!(AssistantBlueprint::new("n", " ", "m").is_err());
    }

    #[tokio::test]
    async fn supplied_ids_are_reused_without_creating() {
        let api = Arc::new(FakeAssistants::default());
        let identity = AssistantIdentity::new(api.clone(), blueprint()).with_existing("asst_existing");

        let id = identity.acquire().await.unwrap().assistant_id.clone();

        assert_eq!(id, "asst_existing");
        assert_eq!(api.count("create_assistant"), 0);
    }

    #[tokio::test]
    async fn created_once_and_persisted() {
        let api = Arc::new(FakeAssistants::default());
        let store = kcv().await;
        let identity = AssistantIdentity::new(api.clone(), blueprint()).with_kcv(store.clone());

        let first = identity.acquire().await.unwrap().assistant_id.clone();
        let second = identity.acquire().await.unwrap().assistant_id.clone();

        assert_eq!(first, second);
        assert_eq!(api.count("create_assistant"), 1);
        assert_eq!(store.get("assistant", "id").await.unwrap(), Some(first));
        assert_eq!(store.get("assistant", "files").await.unwrap(), Some("[]".to_string()));
    }

    #[tokio::test]
    async fn stored_identity_survives_a_restart() {
        let api = Arc::new(FakeAssistants::default());
        let store = kcv().await;
        store.set("assistant", "id", "asst_stored").await.unwrap();
        store.set("assistant", "files", r#"["file_a"]"#).await.unwrap();

        let identity = AssistantIdentity::new(api.clone(), blueprint()).with_kcv(store);
        let state = identity.acquire().await.unwrap().clone();

        assert_eq!(state.assistant_id, "asst_stored");
        assert_eq!(state.file_ids, vec!["file_a".to_string()]);
        assert_eq!(api.count("create_assistant"), 0);
    }

    #[tokio::test]
    async fn data_folder_files_are_uploaded_and_attached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.csv"), "x").unwrap();
        std::fs::write(dir.path().join("a.csv"), "y").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let api = Arc::new(FakeAssistants::default());
        let identity = AssistantIdentity::new(
            api.clone(),
            blueprint().with_data_folder(Some(dir.path().to_path_buf())),
        );

        let state = identity.acquire().await.unwrap().clone();

        assert_eq!(state.file_ids.len(), 2);
        let log = api.log();
        assert_eq!(log[0], "upload_file:a.csv");
        assert_eq!(log[1], "upload_file:b.csv");
        assert_eq!(log[2], format!("create_assistant:{}", state.file_ids.join(",")));
    }

    #[tokio::test]
    async fn failed_creation_removes_uploaded_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "y").unwrap();
        let api = Arc::new(FakeAssistants::default());
        api.fail_on("create_assistant");
        let identity = AssistantIdentity::new(
            api.clone(),
            blueprint().with_data_folder(Some(dir.path().to_path_buf())),
        );

        assert!(identity.acquire().await.is_err());
        assert_eq!(api.count("delete_file"), 1);
        assert!(identity.current().await.is_none());
    }

    #[tokio::test]
    async fn reset_replaces_the_identity() {
        let api = Arc::new(FakeAssistants::default());
        let identity = AssistantIdentity::new(api.clone(), blueprint());
        let first = identity.acquire().await.unwrap().assistant_id.clone();

        let second = identity.reset().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(api.count("delete_assistant"), 1);
        assert_eq!(identity.current().await.unwrap().assistant_id, second);
    }

    #[tokio::test]
    async fn reset_waits_for_readers() {
        let api = Arc::new(FakeAssistants::default());
        let identity = Arc::new(AssistantIdentity::new(api.clone(), blueprint()));
        let guard = identity.acquire().await.unwrap();

        let resetting = {
            let identity = identity.clone();
            tokio::spawn(async move { identity.reset().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(api.count("delete_assistant"), 0);

        drop(guard);
        resetting.await.unwrap().unwrap();
        assert_eq!(api.count("delete_assistant"), 1);
    }

    #[tokio::test]
    async fn cleanup_keeps_going_after_failures() {
        let api = Arc::new(FakeAssistants::default());
        api.fail_on("delete_assistant");
        let store = kcv().await;
        store.set("assistant", "id", "asst_stored").await.unwrap();
        store.set("assistant", "files", r#"["file_a","file_b"]"#).await.unwrap();
        let identity = AssistantIdentity::new(api.clone(), blueprint()).with_kcv(store.clone());

        identity.cleanup().await;

        assert_eq!(api.count("delete_assistant"), 1);
        assert_eq!(api.count("delete_file"), 2);
        assert_eq!(store.get("assistant", "id").await.unwrap(), None);
    }
}
