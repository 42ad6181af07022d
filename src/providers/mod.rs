//! Reply-generation providers.
//!
//! The orchestrator only sees [`LLMProvider`]: hand it a system instruction and
//! the user's text, get reply text back or an error.

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Result;
use crate::session::Message;

pub use openai::OpenAIProvider;

/// Per-request generation knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A provider reply. `content` may be empty, meaning "no answer available".
#[derive(Debug, Clone, PartialEq)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

impl LLMResponse {
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// The opaque reply-generation capability.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, messages: Vec<Message>, options: ChatOptions) -> Result<LLMResponse>;

    fn default_model(&self) -> &str;

    fn name(&self) -> &str;
}

/// HTTP-level failure classes for provider APIs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("unexpected status {status}: {message}")]
    Other { status: u16, message: String },
}

/// Classify a non-success HTTP status and its (already extracted) message.
pub fn parse_provider_error(status: u16, message: &str) -> ProviderError {
    let message = message.to_string();
    match status {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimited(message),
        400 | 404 | 422 => ProviderError::InvalidRequest(message),
        500..=599 => ProviderError::Server(message),
        _ => ProviderError::Other { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_error_classes() {
        assert!(matches!(parse_provider_error(401, "x"), ProviderError::Auth(_)));
        assert!(matches!(parse_provider_error(403, "x"), ProviderError::Auth(_)));
        assert!(matches!(
            parse_provider_error(429, "x"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            parse_provider_error(400, "x"),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(parse_provider_error(503, "x"), ProviderError::Server(_)));
        assert_eq!(
            parse_provider_error(418, "teapot"),
            ProviderError::Other {
                status: 418,
                message: "teapot".into()
            }
        );
    }

    #[test]
    fn test_usage_total() {
        let u = Usage::new(10, 5);
        assert_eq!(u.total_tokens, 15);
    }

    #[test]
    fn test_usage_total_saturates() {
        let u = Usage::new(u32::MAX, 1);
        assert_eq!(u.total_tokens, u32::MAX);
    }

    #[test]
    fn test_chat_options_builder() {
        let opts = ChatOptions::new().with_max_tokens(256);
        assert_eq!(opts.max_tokens, Some(256));
        assert_eq!(opts.temperature, None);
    }
}
