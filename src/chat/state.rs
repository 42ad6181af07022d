//! Per-submission states and outcomes.

use std::fmt;

use crate::error::ShopError;
use crate::session::ChatMessage;

/// Where the assistant is in handling the current submission.
///
/// `Idle -> Submitting -> {Cached, Awaiting, Errored} -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    /// User message recorded, cache not yet consulted.
    Submitting,
    /// Served from the reply cache.
    Cached,
    /// Waiting on the provider.
    Awaiting,
    /// Provider failed; fallback message being recorded.
    Errored,
}

impl ChatState {
    /// Whether the host should show the composing indicator.
    pub fn is_composing(self) -> bool {
        matches!(self, ChatState::Submitting | ChatState::Awaiting)
    }
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatState::Idle => "idle",
            ChatState::Submitting => "submitting",
            ChatState::Cached => "cached",
            ChatState::Awaiting => "awaiting",
            ChatState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty or whitespace-only text.
    Empty,
    /// Another submission is still in flight.
    Busy,
    /// Quick-question index out of range.
    UnknownQuickQuestion(usize),
}

/// Result of one call to `submit`.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Nothing was recorded and no provider call was made.
    Rejected(RejectReason),
    /// Reply served from the cache.
    Cached(ChatMessage),
    /// Fresh reply from the provider, now cached.
    Answered(ChatMessage),
    /// Provider failed; `message` is the fallback notice.
    Failed { message: ChatMessage, error: ShopError },
}

impl SubmitOutcome {
    /// The bot message appended for this submission, if any.
    pub fn reply(&self) -> Option<&ChatMessage> {
        match self {
            SubmitOutcome::Rejected(_) => None,
            SubmitOutcome::Cached(m) | SubmitOutcome::Answered(m) => Some(m),
            SubmitOutcome::Failed { message, .. } => Some(message),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, SubmitOutcome::Rejected(_))
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, SubmitOutcome::Cached(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composing_states() {
        assert!(ChatState::Submitting.is_composing());
        assert!(ChatState::Awaiting.is_composing());
        assert!(!ChatState::Idle.is_composing());
        assert!(!ChatState::Cached.is_composing());
        assert!(!ChatState::Errored.is_composing());
    }

    #[test]
    fn test_rejected_has_no_reply() {
        let outcome = SubmitOutcome::Rejected(RejectReason::Busy);
        assert!(outcome.reply().is_none());
        assert!(outcome.is_rejected());
    }

    #[test]
    fn test_failed_reply_is_fallback() {
        let outcome = SubmitOutcome::Failed {
            message: ChatMessage::bot("error", vec![]),
            error: ShopError::Timeout(5),
        };
        assert_eq!(outcome.reply().unwrap().text, "error");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ChatState::Awaiting.to_string(), "awaiting");
    }
}
