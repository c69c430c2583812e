//! Multi-agent intent dispatcher: one utterance in, classified, routed to a
//! chat, SQL, assistant or retrieval handler, uniform chat messages out.

pub mod agents;
pub mod app;
pub mod assistants;
pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod display;
pub mod providers;
pub mod search;
pub mod store;
pub mod tools;

pub use agents::{Agent, ChatMessage, ChatRequest, ChatRole};
pub use context::AppContext;
pub use crate::core::error::AgentError;
