//! shopchat: sales-assistant chat core.
//!
//! Serves repeated questions from a TTL reply cache, sends new ones to an
//! LLM provider, and attaches catalog products whose name or description
//! contains the question text.

pub mod cache;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod utils;

pub use cache::{KvStore, ResponseCache};
pub use catalog::{Catalog, CatalogItem, ProductMatcher};
pub use chat::{ChatAssistant, ChatState, SubmitOutcome};
pub use config::Config;
pub use error::{Result, ShopError};
pub use providers::{LLMProvider, OpenAIProvider};
