//! Conversation flow state
//!
//! The scripted call flow advances through a fixed, strictly ordered set of
//! states. Transitions only ever move forward and never skip a state.

use serde::{Deserialize, Serialize};

/// State of the scripted conversation flow for one call.
///
/// The derived ordering is the flow ordering: `AwaitingGreeting <
/// AwaitingDate < Complete`. `Complete` is absorbing for the lifetime of the
/// call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// The call just connected; the agent must open with its greeting.
    #[default]
    AwaitingGreeting,
    /// Greeting done; the agent may now offer dates.
    AwaitingDate,
    /// A date was asked for; nothing further is scripted.
    Complete,
}

impl ConversationState {
    /// Wire representation used in session updates and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::AwaitingGreeting => "awaiting_greeting",
            ConversationState::AwaitingDate => "awaiting_date",
            ConversationState::Complete => "complete",
        }
    }

    /// The state that follows this one in the flow, if any.
    pub fn next(&self) -> Option<ConversationState> {
        match self {
            ConversationState::AwaitingGreeting => Some(ConversationState::AwaitingDate),
            ConversationState::AwaitingDate => Some(ConversationState::Complete),
            ConversationState::Complete => None,
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_ordering() {
        assert!(ConversationState::AwaitingGreeting < ConversationState::AwaitingDate);
        assert!(ConversationState::AwaitingDate < ConversationState::Complete);
    }

    #[test]
    fn test_next_never_skips() {
        let mut state = ConversationState::default();
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }
        assert_eq!(
            seen,
            vec![
                ConversationState::AwaitingGreeting,
                ConversationState::AwaitingDate,
                ConversationState::Complete,
            ]
        );
    }

    #[test]
    fn test_wire_representation() {
        let json = serde_json::to_string(&ConversationState::AwaitingDate).unwrap();
        assert_eq!(json, "\"awaiting_date\"");
    }
}
