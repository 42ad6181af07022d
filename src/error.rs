//! Error types for shopchat.
//!
//! `ShopError` is the crate-wide error. Storage-medium failures have their own
//! [`StoreError`](crate::cache::StoreError) and never leave the cache layer;
//! provider HTTP failures are classified by
//! [`ProviderError`](crate::providers::ProviderError) before being folded in here.

use thiserror::Error;

use crate::providers::ProviderError;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The reply-generation capability failed (network, auth, malformed body).
    #[error("Provider error: {0}")]
    Provider(String),

    /// The provider rate-limited or refused the request for quota reasons.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The provider did not answer within the configured bound.
    #[error("Reply timed out after {0}s")]
    Timeout(u64),

    /// Catalog validation failed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<ProviderError> for ShopError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited(msg) => ShopError::QuotaExceeded(msg),
            other => ShopError::Provider(other.to_string()),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ShopError>;
