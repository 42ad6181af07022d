//! Append-only transcript of the current chat session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::ReplyPayload;
use crate::catalog::CatalogItem;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry of the transcript. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    /// Matched products; only ever set on bot messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<CatalogItem>>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self::new(Sender::User, text.to_string(), None)
    }

    /// Bot message; an empty product list is stored as `None`.
    pub fn bot(text: &str, products: Vec<CatalogItem>) -> Self {
        let products = if products.is_empty() {
            None
        } else {
            Some(products)
        };
        Self::new(Sender::Bot, text.to_string(), products)
    }

    /// Bot message rebuilt verbatim from a cached reply.
    pub fn from_payload(payload: ReplyPayload) -> Self {
        Self::new(Sender::Bot, payload.text, payload.products)
    }

    /// The cacheable part of a bot message.
    pub fn to_payload(&self) -> ReplyPayload {
        ReplyPayload {
            text: self.text.clone(),
            products: self.products.clone(),
        }
    }

    fn new(sender: Sender, text: String, products: Option<Vec<CatalogItem>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text,
            products,
            created_at: Utc::now(),
        }
    }
}

/// Ordered, append-only list of chat messages.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
