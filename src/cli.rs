use crate::agents::message::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "amux", author, version, about, long_about = None)]
pub struct Args {
    /// Display name attached to every message
    #[arg(long, default_value = "user")]
    pub user_name: String,

    /// Caller id attached to every message
    #[arg(long, default_value = "user")]
    pub user_id: String,

    /// Output-length budget passed to the handlers
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Sampling temperature passed to the handlers
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Print the messages as JSON instead of formatted text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Classify the input and route it to the matching agent
    Ask { input: Vec<String> },
    /// Answer with a plain completion over a snapshot of the sales data
    Chat { input: Vec<String> },
    /// Generate a SQL statement, run it and show the rows
    Sql { input: Vec<String> },
    /// Hand the request to the remote assistant
    Assistant { input: Vec<String> },
    /// Answer from the search index
    Rag { input: Vec<String> },
    /// Replace the remote assistant with a fresh one
    Reset,
    /// Delete the remote assistant, its files and any kept threads
    Cleanup,
}

impl Command {
    /// The words of the utterance joined back together, if the command takes one.
    pub fn input(&self) -> Option<String> {
        match self {
            Command::Ask { input }
            | Command::Chat { input }
            | Command::Sql { input }
            | Command::Assistant { input }
            | Command::Rag { input } => Some(input.join(" ")),
            Command::Reset | Command::Cleanup => None,
        }
    }
}
