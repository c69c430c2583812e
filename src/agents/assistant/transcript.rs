use crate::agents::message::{ChatMessage, ChatRequest};
use crate::assistants::{Annotation, AssistantsApi, MessageContent, ThreadMessage};
use crate::core::error::AgentError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Where generated images are written and how they are addressed afterwards.
#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub dir: PathBuf,
    pub url_prefix: String,
}

impl ImageOutput {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), file_name)
    }
}

/// Messages newest-first in, the latest user turn and everything after it
/// out, oldest-first.
pub fn latest_exchange(messages: Vec<ThreadMessage>) -> Vec<ThreadMessage> {
    let mut exchange = Vec::new();
    for message in messages {
        let is_user = message.role == "user";
        exchange.push(message);
        if is_user {
            break;
        }
    }
    exchange.reverse();
    exchange
}

/// Flattens the latest exchange of a thread into chat messages.
pub async fn print_messages(
    api: &dyn AssistantsApi,
    request: &ChatRequest,
    messages: Vec<ThreadMessage>,
    images: &ImageOutput,
) -> Vec<ChatMessage> {
    let mut out = Vec::new();

    for message in latest_exchange(messages) {
        for content in &message.content {
            match content {
                MessageContent::Text { text } => {
                    let chat = if message.role == "user" {
                        ChatMessage::user(request, text.value.clone())
                    } else {
                        ChatMessage::assistant(request, text.value.clone())
                    };
                    out.push(chat);

                    for annotation in &text.annotations {
                        if let Annotation::FilePath { text, file_path } = annotation {
                            inspect_generated_file(api, text, &file_path.file_id).await;
                        }
                    }
                }
                MessageContent::ImageFile { image_file } => {
                    match save_image(api, &image_file.file_id, &images.dir).await {
                        Ok(file_name) => {
                            out.push(ChatMessage::image(request, images.url_for(&file_name)))
                        }
                        Err(e) => {
                            warn!(file_id = %image_file.file_id, error = %e, "could not save generated image")
                        }
                    }
                }
                MessageContent::Unsupported => {}
            }
        }
    }

    out
}

async fn inspect_generated_file(api: &dyn AssistantsApi, label: &str, file_id: &str) {
    match api.file_content(file_id).await {
        Ok(bytes) => info!(
            file_id = %file_id,
            label = %label,
            bytes = bytes.len(),
            content = %String::from_utf8_lossy(&bytes),
            "assistant generated a file"
        ),
        Err(e) => warn!(file_id = %file_id, error = %e, "could not fetch generated file"),
    }
}

async fn save_image(
    api: &dyn AssistantsApi,
    file_id: &str,
    dir: &Path,
) -> Result<String, AgentError> {
    let bytes = api.file_content(file_id).await?;
    tokio::fs::create_dir_all(dir).await?;
    let file_name = format!("{}.png", Uuid::new_v4());
    tokio::fs::write(dir.join(&file_name), bytes).await?;
    Ok(file_name)
}
