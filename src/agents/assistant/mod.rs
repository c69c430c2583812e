//! Handler backed by the remote assistant service: a shared assistant
//! identity, one short-lived thread per request, and a polled run.

use super::Agent;
use super::message::{ChatMessage, ChatRequest};
use crate::assistants::AssistantsApi;
use crate::config::AssistantSettings;
use crate::core::error::AgentError;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

pub mod identity;
pub mod run;
pub mod transcript;

pub use identity::{AssistantBlueprint, AssistantIdentity, IdentityState};
pub use run::{ActionHandler, RunOutcome, RunPoller, Sleeper, TokioSleeper};
pub use transcript::{ImageOutput, latest_exchange, print_messages};

pub struct AssistantAgent {
    api: Arc<dyn AssistantsApi>,
    identity: Arc<AssistantIdentity>,
    poller: RunPoller,
    action_handler: Option<Arc<dyn ActionHandler>>,
    images: ImageOutput,
    keep_state: bool,
    retained_threads: Mutex<Vec<String>>,
}

impl AssistantAgent {
    pub fn new(api: Arc<dyn AssistantsApi>, identity: Arc<AssistantIdentity>) -> Self {
        let defaults = AssistantSettings::default();
        Self {
            api,
            identity,
            poller: RunPoller::from_settings(&defaults),
            action_handler: None,
            images: ImageOutput::new(defaults.image_dir, defaults.image_url_prefix),
            keep_state: defaults.keep_state,
            retained_threads: Mutex::new(Vec::new()),
        }
    }

    pub fn from_settings(
        api: Arc<dyn AssistantsApi>,
        identity: Arc<AssistantIdentity>,
        settings: &AssistantSettings,
    ) -> Self {
        Self::new(api, identity)
            .with_poller(RunPoller::from_settings(settings))
            .with_images(ImageOutput::new(
                settings.image_dir.clone(),
                settings.image_url_prefix.clone(),
            ))
            .keep_state(settings.keep_state)
    }

    pub fn with_poller(mut self, poller: RunPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn with_action_handler(mut self, handler: Arc<dyn ActionHandler>) -> Self {
        self.action_handler = Some(handler);
        self
    }

    pub fn with_images(mut self, images: ImageOutput) -> Self {
        self.images = images;
        self
    }

    /// Keep each request's thread remotely instead of deleting it.
    pub fn keep_state(mut self, keep: bool) -> Self {
        self.keep_state = keep;
        self
    }

    pub fn identity(&self) -> &Arc<AssistantIdentity> {
        &self.identity
    }

    pub fn retained_threads(&self) -> Vec<String> {
        self.retained_threads
            .lock()
            .map(|threads| threads.clone())
            .unwrap_or_default()
    }

    async fn converse(
        &self,
        thread_id: &str,
        assistant_id: &str,
        request: &ChatRequest,
    ) -> Result<Vec<ChatMessage>, AgentError> {
        self.api.add_message(thread_id, &request.input).await?;

        let note = format!(
            "The current date and time is: {}.",
            chrono::Local::now().format("%x %X")
        );
        let run = self
            .api
            .create_run(thread_id, assistant_id, Some(&note))
            .await?;

        let outcome = self
            .poller
            .drive(self.api.as_ref(), run, self.action_handler.as_deref())
            .await?;
        info!(outcome = ?outcome, "run settled");

        if !outcome.has_transcript() {
            return Ok(Vec::new());
        }
        let messages = self.api.list_messages(thread_id).await?;
        Ok(print_messages(self.api.as_ref(), request, messages, &self.images).await)
    }

    async fn release_thread(&self, thread_id: &str) {
        if self.keep_state {
            if let Ok(mut threads) = self.retained_threads.lock() {
                threads.push(thread_id.to_string());
            }
            return;
        }
        if let Err(e) = self.api.delete_thread(thread_id).await {
            warn!(thread_id = %thread_id, error = %e, "failed to delete thread");
        }
    }

    /// Best-effort removal of everything this handler created remotely.
    pub async fn cleanup(&self) {
        let threads = self
            .retained_threads
            .lock()
            .map(|mut threads| std::mem::take(&mut *threads))
            .unwrap_or_default();
        let deletions = threads.iter().map(|thread_id| async move {
            if let Err(e) = self.api.delete_thread(thread_id).await {
                warn!(thread_id = %thread_id, error = %e, "failed to delete thread");
            }
        });
        join_all(deletions).await;

        self.identity.cleanup().await;
    }
}

#[async_trait]
impl Agent for AssistantAgent {
    #[instrument(skip_all, fields(user_id = %request.user_id))]
    async fn process(&self, request: &ChatRequest) -> Result<Vec<ChatMessage>, AgentError> {
        let identity = self.identity.acquire().await?;
        let thread_id = self.api.create_thread().await?;

        let result = self
            .converse(&thread_id, &identity.assistant_id, request)
            .await;
        self.release_thread(&thread_id).await;
        result
    }
}
