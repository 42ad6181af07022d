//! Terminal host for the chat core.

mod cache;
mod chat;
mod common;
mod search;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use shopchat::config::Config;

#[derive(Parser)]
#[command(name = "shopchat", version, about = "Sales-assistant chat with cached replies")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat session (default)
    Chat,
    /// Ask a single question and print the reply
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Search the catalog without calling the provider
    Search {
        /// Substring to look for in product names and descriptions
        #[arg(default_value = "")]
        query: String,
    },
    /// Inspect or maintain the reply cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CacheAction {
    /// Show entry count, TTL and medium
    Stats,
    /// Remove every cached reply
    Clear,
    /// Remove expired and unreadable entries
    Purge,
}

pub(crate) async fn run() -> Result<()> {
    let cli = Cli::parse();
    let (config, ignored) =
        Config::load_with_notices().with_context(|| "Failed to load configuration")?;
    common::init_logging(&config.log);
    for notice in &ignored {
        tracing::warn!("{}", notice);
    }

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat::cmd_chat(config).await,
        Command::Ask { text } => chat::cmd_ask(config, &text.join(" ")).await,
        Command::Search { query } => search::cmd_search(&config, &query),
        Command::Cache { action } => cache::cmd_cache(&config, action),
    }
}
