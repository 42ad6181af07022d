//! OpenAI-compatible chat-completions provider.
//!
//! Auth priority: config key → `OPENAI_API_KEY`. Any server that speaks the
//! `/chat/completions` shape works when `base_url` points at it.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{Result, ShopError};
use crate::session::Message;

use super::{parse_provider_error, ChatOptions, LLMProvider, LLMResponse, Usage};

/// Public OpenAI API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Chat-completions client with bearer-token auth.
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    base_url: String,
    defaults: ChatOptions,
    client: Client,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(api_key, model, OPENAI_API_BASE)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            defaults: ChatOptions::default(),
            client: Self::build_client(),
        }
    }

    /// Build from config. Returns `None` when no API key is available.
    pub fn from_config(config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().filter(|k| !k.is_empty())?;
        let mut provider = Self::with_base_url(api_key, &config.model, &config.base_url);
        provider.defaults = ChatOptions {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };
        Some(provider)
    }

    fn build_client() -> Client {
        Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new())
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Request body; per-call options override the configured defaults.
    fn build_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        let mut body = json!({
            "model": &self.model,
            "messages": messages,
        });
        if let Some(max_tokens) = options.max_tokens.or(self.defaults.max_tokens) {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temp) = options.temperature.or(self.defaults.temperature) {
            body["temperature"] = json!(temp);
        }
        body
    }

    /// Pull the first choice's text out of a response. A `null` content is an
    /// empty reply, not an error.
    fn parse_response(json: &Value) -> Result<LLMResponse> {
        let choice = json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .ok_or_else(|| ShopError::Provider("No choices in OpenAI response".into()))?;

        let content = choice["message"]["content"].as_str().unwrap_or_default();
        let mut response = LLMResponse::text(content);
        if let Some(usage) = Self::extract_usage(json) {
            response = response.with_usage(usage);
        }
        Ok(response)
    }

    fn extract_usage(json: &Value) -> Option<Usage> {
        let usage = json.get("usage")?;
        let prompt = u32::try_from(usage["prompt_tokens"].as_u64()?).ok()?;
        let completion = u32::try_from(usage["completion_tokens"].as_u64()?).ok()?;
        Some(Usage::new(prompt, completion))
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(&self, messages: Vec<Message>, options: ChatOptions) -> Result<LLMResponse> {
        let body = self.build_body(&messages, &options);

        debug!("OpenAI request to model {}", self.model);

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ShopError::Provider(format!("OpenAI request failed: {}", e)))?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(|e| {
                ShopError::Provider(format!("Failed to parse OpenAI response: {}", e))
            })?;
            return Self::parse_response(&json);
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();

        let body_msg = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| {
                v["error"]["message"]
                    .as_str()
                    .map(|s| format!("OpenAI API error: {}", s))
            })
            .unwrap_or_else(|| format!("OpenAI API error: {}", error_text));

        Err(ShopError::from(parse_provider_error(status, &body_msg)))
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "openai"
    }
}
