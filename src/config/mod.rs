//! Configuration: `~/.shopchat/config.json` plus environment overrides.
//!
//! Every section is `#[serde(default)]`, so a partial file (or none at all)
//! yields working defaults. Environment variables win over the file:
//!
//! | Variable                  | Field                  |
//! |---------------------------|------------------------|
//! | `OPENAI_API_KEY`          | `provider.api_key`     |
//! | `SHOPCHAT_MODEL`          | `provider.model`       |
//! | `SHOPCHAT_BASE_URL`       | `provider.base_url`    |
//! | `SHOPCHAT_CACHE_TTL_SECS` | `cache.ttl_secs`       |
//! | `SHOPCHAT_CATALOG`        | `catalog.path`         |
//! | `SHOPCHAT_LOG`            | `log.filter`           |
//! | `SHOPCHAT_LOG_JSON`       | `log.json`             |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::EmptyQueryPolicy;
use crate::chat::prompt::{
    DEFAULT_EMPTY_REPLY_MESSAGE, DEFAULT_FALLBACK_MESSAGE, DEFAULT_QUICK_QUESTIONS,
    DEFAULT_SYSTEM_PROMPT,
};
use crate::error::{Result, ShopError};
use crate::providers::openai::{DEFAULT_OPENAI_MODEL, OPENAI_API_BASE};

/// Default localStorage-sized quota for the cache medium (5 MiB).
pub const DEFAULT_CACHE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
    pub chat: ChatConfig,
    pub log: LogConfig,
}

/// Reply-generation provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Which medium backs the reply cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// JSON file under the config directory (default).
    #[default]
    File,
    /// Process memory only; gone at exit.
    Memory,
}

/// Reply cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false the medium is disabled and every lookup misses.
    pub enabled: bool,
    pub ttl_secs: u64,
    pub backend: CacheBackend,
    /// Override for the file medium; defaults to `~/.shopchat/cache/responses.json`.
    pub path: Option<PathBuf>,
    /// Medium capacity. `None` means unbounded.
    pub quota_bytes: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 24 * 60 * 60,
            backend: CacheBackend::File,
            path: None,
            quota_bytes: Some(DEFAULT_CACHE_QUOTA_BYTES),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| Config::dir().join("cache").join("responses.json"))
    }
}

/// Catalog source and matching policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// `.toml` or `.json` catalog file. `None` uses the built-in items.
    pub path: Option<PathBuf>,
    pub empty_query: EmptyQueryPolicy,
}

/// Assistant texts and the reply bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub fallback_message: String,
    pub empty_reply_message: String,
    pub quick_questions: Vec<String>,
    pub reply_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            empty_reply_message: DEFAULT_EMPTY_REPLY_MESSAGE.to_string(),
            quick_questions: DEFAULT_QUICK_QUESTIONS
                .iter()
                .map(|q| q.to_string())
                .collect(),
            reply_timeout_secs: 30,
        }
    }
}

impl ChatConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

/// Logging output settings for the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// `~/.shopchat`, or `./.shopchat` when no home directory is known.
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shopchat")
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load `.env`, the default config file, then environment overrides.
    pub fn load() -> Result<Self> {
        let (config, ignored) = Self::load_with_notices()?;
        for notice in &ignored {
            warn!("{}", notice);
        }
        Ok(config)
    }

    /// Like [`Config::load`], but hands back ignored-override notices instead of
    /// logging them, for callers that set up logging from the loaded config.
    pub fn load_with_notices() -> Result<(Self, Vec<String>)> {
        let _ = dotenvy::dotenv();
        let mut config = Self::load_from_path(&Self::path())?;
        let ignored = config.apply_overrides_with(|key| std::env::var(key).ok());
        config.validate()?;
        Ok((config, ignored))
    }

    /// Parse a config file. A missing file yields defaults; a malformed one is an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ShopError::Config(format!("Failed to parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ShopError::Io(e)),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        for notice in self.apply_overrides_with(|key| std::env::var(key).ok()) {
            warn!("{}", notice);
        }
    }

    /// Apply overrides from an arbitrary lookup (the process environment in production).
    ///
    /// Returns a notice for every variable that was set but could not be applied.
    pub fn apply_overrides_with<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = get("SHOPCHAT_MODEL") {
            self.provider.model = model;
        }
        if let Some(url) = get("SHOPCHAT_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(raw) = get("SHOPCHAT_CACHE_TTL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(ttl) => self.cache.ttl_secs = ttl,
                Err(e) => {
                    ignored.push(format!("Ignoring SHOPCHAT_CACHE_TTL_SECS='{}': {}", raw, e))
                }
            }
        }
        if let Some(path) = get("SHOPCHAT_CATALOG") {
            self.catalog.path = Some(PathBuf::from(path));
        }
        if let Some(filter) = get("SHOPCHAT_LOG") {
            self.log.filter = filter;
        }
        if let Some(raw) = get("SHOPCHAT_LOG_JSON") {
            self.log.json = matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        ignored
    }

    /// Reject settings the chat flow cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chat.reply_timeout_secs == 0 {
            return Err(ShopError::Config(
                "chat.reply_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.chat.fallback_message.trim().is_empty() {
            return Err(ShopError::Config(
                "chat.fallback_message must not be empty".into(),
            ));
        }
        if let Some(i) = self
            .chat
            .quick_questions
            .iter()
            .position(|q| q.trim().is_empty())
        {
            return Err(ShopError::Config(format!(
                "chat.quick_questions[{}] is empty",
                i
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.cache.backend, CacheBackend::File);
        assert_eq!(cfg.provider.model, "gpt-3.5-turbo");
        assert_eq!(cfg.chat.quick_questions.len(), 4);
        assert_eq!(cfg.chat.reply_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.catalog.empty_query, EmptyQueryPolicy::MatchNone);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::load_from_path(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cache":{"backend":"memory","ttl_secs":60},"catalog":{"empty_query":"match_all"}}"#,
        )
        .unwrap();
        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.cache.backend, CacheBackend::Memory);
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.catalog.empty_query, EmptyQueryPolicy::MatchAll);
        assert_eq!(cfg.chat, ChatConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ cache: ").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ShopError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("OPENAI_API_KEY", "sk-env"),
            ("SHOPCHAT_MODEL", "gpt-4o-mini"),
            ("SHOPCHAT_CACHE_TTL_SECS", "120"),
            ("SHOPCHAT_LOG_JSON", "true"),
        ]);
        let mut cfg = Config::default();
        let ignored = cfg.apply_overrides_with(|k| vars.get(k).cloned());
        assert!(ignored.is_empty());
        assert_eq!(cfg.provider.api_key.as_deref(), Some("sk-env"));
        assert_eq!(cfg.provider.model, "gpt-4o-mini");
        assert_eq!(cfg.cache.ttl_secs, 120);
        assert!(cfg.log.json);
    }

    #[test]
    fn test_env_bad_ttl_is_ignored() {
        let vars = env(&[("SHOPCHAT_CACHE_TTL_SECS", "soon")]);
        let mut cfg = Config::default();
        let ignored = cfg.apply_overrides_with(|k| vars.get(k).cloned());
        assert_eq!(cfg.cache.ttl_secs, 86_400);
        assert_eq!(ignored.len(), 1);
        assert!(ignored[0].contains("SHOPCHAT_CACHE_TTL_SECS='soon'"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let vars = env(&[("OPENAI_API_KEY", "  ")]);
        let mut cfg = Config::default();
        cfg.apply_overrides_with(|k| vars.get(k).cloned());
        assert!(cfg.provider.api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut cfg = Config::default();
        cfg.chat.reply_timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_quick_question() {
        let mut cfg = Config::default();
        cfg.chat.quick_questions.push("   ".into());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("quick_questions[4]"));
    }

    #[test]
    fn test_cache_path_override() {
        let cfg = CacheConfig {
            path: Some(PathBuf::from("/tmp/x.json")),
            ..CacheConfig::default()
        };
        assert_eq!(cfg.resolved_path(), PathBuf::from("/tmp/x.json"));
        assert!(CacheConfig::default()
            .resolved_path()
            .ends_with("cache/responses.json"));
    }
}
