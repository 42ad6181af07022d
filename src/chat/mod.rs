//! Orchestration: ties the reply cache, the product matcher and the provider
//! together per user submission.

pub mod assistant;
pub mod prompt;
pub mod state;

pub use assistant::{ChatAssistant, ChatAssistantBuilder};
pub use prompt::COMPOSING_LABEL;
pub use state::{ChatState, RejectReason, SubmitOutcome};
