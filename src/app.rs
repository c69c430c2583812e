use crate::agents::{Agent, ChatMessage, ChatRequest};
use crate::cli::{Args, Command};
use crate::context::AppContext;
use crate::core::error::AgentError;
use crate::display;
use is_terminal::IsTerminal;
use std::io::{self, Read};
use tracing::info;

pub struct Application {
    pub args: Args,
    pub context: AppContext,
}

impl Application {
    pub fn new(args: Args, context: AppContext) -> Self {
        Self { args, context }
    }

    pub async fn run(&self) -> Result<(), AgentError> {
        match &self.args.command {
            Command::Reset => {
                let id = self.context.reset_assistant().await?;
                display::display_info(&format!("Assistant reset, new id {}", id));
                return Ok(());
            }
            Command::Cleanup => {
                self.context.cleanup().await;
                display::display_info("Remote assistant resources released");
                return Ok(());
            }
            _ => {}
        }

        let request = self.build_request(read_piped_context()?)?;
        let messages = self.dispatch(&request).await?;

        if self.args.json {
            display::display_json(&messages)
        } else {
            display::display_messages(&messages);
            Ok(())
        }
    }

    fn build_request(&self, context: Option<String>) -> Result<ChatRequest, AgentError> {
        let input = self
            .args
            .command
            .input()
            .filter(|input| !input.trim().is_empty())
            .ok_or_else(|| AgentError::Input("No query provided".to_string()))?;

        let mut request = ChatRequest::new(&self.args.user_name, &self.args.user_id, input)
            .with_sampling(self.args.max_tokens, self.args.temperature);
        if let Some(context) = context {
            request = request.with_context(context);
        }
        Ok(request)
    }

    async fn dispatch(&self, request: &ChatRequest) -> Result<Vec<ChatMessage>, AgentError> {
        info!(command = ?self.args.command, "handling request");
        match &self.args.command {
            Command::Ask { .. } => self.context.proxy()?.process(request).await,
            Command::Chat { .. } => self.context.gpt_agent().process(request).await,
            Command::Sql { .. } => self.context.sql_agent().process(request).await,
            Command::Assistant { .. } => self.context.assistant.process(request).await,
            Command::Rag { .. } => self.context.rag_agent()?.process(request).await,
            Command::Reset | Command::Cleanup => Ok(Vec::new()),
        }
    }
}

/// Text piped on stdin becomes the request context.
fn read_piped_context() -> Result<Option<String>, AgentError> {
    if io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| AgentError::Input(format!("Failed to read from stdin: {}", e)))?;
    Ok(Some(buffer).filter(|b| !b.trim().is_empty()))
}
