//! The chat orchestrator: cache lookup, provider call, product matching.
//!
//! One submission runs at a time. A second `submit` while the first is still
//! in flight is rejected without touching the transcript or the provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shopchat::cache::{MemoryStore, ResponseCache, DEFAULT_TTL};
//! use shopchat::chat::ChatAssistant;
//! use shopchat::providers::OpenAIProvider;
//!
//! let assistant = ChatAssistant::builder()
//!     .provider(Arc::new(OpenAIProvider::new("sk-...", "gpt-3.5-turbo")))
//!     .cache(ResponseCache::new(MemoryStore::new(), DEFAULT_TTL))
//!     .build()?;
//!
//! let outcome = assistant.submit("¿Tienen laptops?").await;
//! println!("{}", outcome.reply().unwrap().text);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::cache::{create_cache, CacheStats, KvStore, ResponseCache};
use crate::catalog::{Catalog, EmptyQueryPolicy, ProductMatcher};
use crate::config::{ChatConfig, Config};
use crate::error::{Result, ShopError};
use crate::providers::{ChatOptions, LLMProvider};
use crate::session::{ChatMessage, Message, Transcript};
use crate::utils::text::preview;

use super::state::{ChatState, RejectReason, SubmitOutcome};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sales-assistant chat session over an injected cache medium `S`.
pub struct ChatAssistant<S: KvStore> {
    provider: Arc<dyn LLMProvider>,
    cache: Mutex<ResponseCache<S>>,
    matcher: ProductMatcher,
    transcript: Mutex<Transcript>,
    settings: ChatConfig,
    in_flight: AtomicBool,
    states: StateFeed,
}

/// Number of transitions a lagging [`ChatAssistant::transitions`] receiver can
/// fall behind before it skips ahead.
const TRANSITION_BUFFER: usize = 32;

/// Latest state for polling hosts plus every transition for recorders.
struct StateFeed {
    latest: watch::Sender<ChatState>,
    transitions: broadcast::Sender<ChatState>,
}

impl StateFeed {
    fn new() -> Self {
        let (latest, _) = watch::channel(ChatState::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            latest,
            transitions,
        }
    }

    fn set(&self, state: ChatState) {
        self.latest.send_replace(state);
        // No receivers is fine.
        let _ = self.transitions.send(state);
    }
}

/// Releases the in-flight flag and returns to `Idle`, including when the
/// submit future is dropped mid-request.
struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
    states: &'a StateFeed,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.states.set(ChatState::Idle);
        self.in_flight.store(false, Ordering::Release);
    }
}

impl<S: KvStore> ChatAssistant<S> {
    pub fn builder() -> ChatAssistantBuilder<S> {
        ChatAssistantBuilder::new()
    }

    /// Handle one user submission end to end.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Rejected(RejectReason::Empty);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Submission rejected, another one is in flight");
            return SubmitOutcome::Rejected(RejectReason::Busy);
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            states: &self.states,
        };

        lock(&self.transcript).push(ChatMessage::user(text));
        self.set_state(ChatState::Submitting);
        info!(
            chars = text.chars().count(),
            preview = %preview(text, 32),
            "Chat query submitted"
        );

        let cached = lock(&self.cache).get(text);
        if let Some(payload) = cached {
            self.set_state(ChatState::Cached);
            let message = ChatMessage::from_payload(payload);
            lock(&self.transcript).push(message.clone());
            debug!("Reply served from cache");
            return SubmitOutcome::Cached(message);
        }

        self.set_state(ChatState::Awaiting);
        match self.generate_reply(text).await {
            Ok(reply) => {
                let reply = if reply.trim().is_empty() {
                    self.settings.empty_reply_message.clone()
                } else {
                    reply
                };
                let products = self.matcher.find_matches(text);
                let message = ChatMessage::bot(&reply, products);
                lock(&self.transcript).push(message.clone());
                lock(&self.cache).set(text, &message.to_payload());
                info!(
                    products = message.products.as_ref().map_or(0, Vec::len),
                    "Reply generated"
                );
                SubmitOutcome::Answered(message)
            }
            Err(error) => {
                warn!(error = %error, "Reply generation failed, sending fallback");
                self.set_state(ChatState::Errored);
                let message = ChatMessage::bot(&self.settings.fallback_message, Vec::new());
                lock(&self.transcript).push(message.clone());
                SubmitOutcome::Failed { message, error }
            }
        }
    }

    /// Submit the configured quick question at `index`.
    pub async fn submit_quick_question(&self, index: usize) -> SubmitOutcome {
        match self.settings.quick_questions.get(index) {
            Some(question) => {
                let question = question.clone();
                self.submit(&question).await
            }
            None => SubmitOutcome::Rejected(RejectReason::UnknownQuickQuestion(index)),
        }
    }

    pub fn quick_questions(&self) -> &[String] {
        &self.settings.quick_questions
    }

    pub fn state(&self) -> ChatState {
        *self.states.latest.borrow()
    }

    /// Whether the host should show the composing indicator right now.
    pub fn is_composing(&self) -> bool {
        self.state().is_composing()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.states.latest.subscribe()
    }

    /// Receive every transition in order, including the short-lived `Cached`
    /// and `Errored` states a [`watch`] subscriber can miss.
    pub fn transitions(&self) -> broadcast::Receiver<ChatState> {
        self.states.transitions.subscribe()
    }

    /// Snapshot of the transcript so far.
    pub fn messages(&self) -> Vec<ChatMessage> {
        lock(&self.transcript).messages().to_vec()
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.cache).stats()
    }

    /// Run a maintenance operation against the reply cache.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut ResponseCache<S>) -> R) -> R {
        f(&mut lock(&self.cache))
    }

    pub fn matcher(&self) -> &ProductMatcher {
        &self.matcher
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    // -- private helpers ---------------------------------------------------

    fn set_state(&self, state: ChatState) {
        debug!(state = %state, "Chat state");
        self.states.set(state);
    }

    /// One bounded provider call with the system instruction and the raw text.
    async fn generate_reply(&self, text: &str) -> Result<String> {
        let messages = vec![
            Message::system(&self.settings.system_prompt),
            Message::user(text),
        ];
        let timeout = self.settings.reply_timeout();
        match tokio::time::timeout(timeout, self.provider.chat(messages, ChatOptions::new())).await
        {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ShopError::Timeout(timeout.as_secs())),
        }
    }
}

impl ChatAssistant<Box<dyn KvStore>> {
    /// Wire an assistant from config: cache medium, catalog, texts.
    pub fn from_config(config: &Config, provider: Arc<dyn LLMProvider>) -> Result<Self> {
        let catalog = Catalog::load_or_builtin(config.catalog.path.as_deref())?;
        Self::builder()
            .provider(provider)
            .cache(create_cache(&config.cache))
            .matcher(ProductMatcher::new(catalog, config.catalog.empty_query))
            .settings(config.chat.clone())
            .build()
    }
}

/// Builder for [`ChatAssistant`]. Provider and cache are required.
pub struct ChatAssistantBuilder<S: KvStore> {
    provider: Option<Arc<dyn LLMProvider>>,
    cache: Option<ResponseCache<S>>,
    matcher: Option<ProductMatcher>,
    settings: ChatConfig,
}

impl<S: KvStore> ChatAssistantBuilder<S> {
    pub fn new() -> Self {
        Self {
            provider: None,
            cache: None,
            matcher: None,
            settings: ChatConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn cache(mut self, cache: ResponseCache<S>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Defaults to the built-in catalog with [`EmptyQueryPolicy::MatchNone`].
    pub fn matcher(mut self, matcher: ProductMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn settings(mut self, settings: ChatConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<ChatAssistant<S>> {
        let provider = self
            .provider
            .ok_or_else(|| ShopError::Config("ChatAssistant requires a provider".into()))?;
        let cache = self
            .cache
            .ok_or_else(|| ShopError::Config("ChatAssistant requires a cache".into()))?;
        if self.settings.reply_timeout_secs == 0 {
            return Err(ShopError::Config(
                "reply timeout must be greater than zero".into(),
            ));
        }
        let matcher = self.matcher.unwrap_or_else(|| {
            ProductMatcher::new(Catalog::builtin(), EmptyQueryPolicy::MatchNone)
        });
        Ok(ChatAssistant {
            provider,
            cache: Mutex::new(cache),
            matcher,
            transcript: Mutex::new(Transcript::new()),
            settings: self.settings,
            in_flight: AtomicBool::new(false),
            states: StateFeed::new(),
        })
    }
}

impl<S: KvStore> Default for ChatAssistantBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
