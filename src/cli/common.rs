//! Shared setup for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use shopchat::cache::KvStore;
use shopchat::chat::ChatAssistant;
use shopchat::config::{Config, LogConfig};
use shopchat::providers::OpenAIProvider;

/// Initialize `tracing` on stderr. `RUST_LOG` wins over `log.filter`.
pub(crate) fn init_logging(log: &LogConfig) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match log.filter.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: log filter '{}' is not valid ({}); falling back to 'info'",
                    log.filter, e
                );
                EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Build the assistant from config with the OpenAI-compatible provider.
pub(crate) fn create_assistant(config: &Config) -> Result<ChatAssistant<Box<dyn KvStore>>> {
    let provider = OpenAIProvider::from_config(&config.provider).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
             Set OPENAI_API_KEY or provider.api_key in {}",
            Config::path().display()
        )
    })?;
    ChatAssistant::from_config(config, Arc::new(provider))
        .with_context(|| "Failed to initialize chat assistant")
}
