//! Flow gate
//!
//! Tracks the conversation state for one call and advances it on accepted
//! intents. Transitions are monotonic forward-only; an intent that belongs
//! to the flow but arrives out of order is a violation and leaves the state
//! unchanged. `Complete` absorbs everything silently.

use callbridge_core::ConversationState;

/// Outcome of feeding one accepted intent to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Forward transition; the caller must re-issue the engine instructions.
    Advanced {
        from: ConversationState,
        to: ConversationState,
    },
    /// Intent does not drive the flow from here; state unchanged.
    Unchanged,
    /// A flow intent arrived in a state it does not belong to; state
    /// unchanged, caller logs and counts.
    Violation {
        state: ConversationState,
        intent: String,
    },
}

/// Forward-only state gate for one call.
#[derive(Debug, Default)]
pub struct FlowGate {
    state: ConversationState,
}

impl FlowGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current conversation state.
    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// The intent that advances the flow out of a state.
    fn expected(state: ConversationState) -> Option<&'static str> {
        match state {
            ConversationState::AwaitingGreeting => Some("greeting"),
            ConversationState::AwaitingDate => Some("ask_date"),
            ConversationState::Complete => None,
        }
    }

    /// Whether an intent drives a transition anywhere in the flow table.
    fn is_flow_intent(intent: &str) -> bool {
        matches!(intent, "greeting" | "ask_date")
    }

    /// Feed one accepted intent to the gate.
    pub fn advance(&mut self, intent: &str) -> FlowOutcome {
        let from = self.state;
        match Self::expected(from) {
            // Complete is absorbing: nothing advances, nothing violates.
            None => FlowOutcome::Unchanged,
            Some(expected) if intent == expected => {
                // expected() only answers for states with a successor
                let to = from.next().unwrap_or(from);
                self.state = to;
                FlowOutcome::Advanced { from, to }
            }
            Some(_) if Self::is_flow_intent(intent) => FlowOutcome::Violation {
                state: from,
                intent: intent.to_string(),
            },
            Some(_) => FlowOutcome::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_sequence_reaches_complete() {
        let mut gate = FlowGate::new();

        assert_eq!(
            gate.advance("greeting"),
            FlowOutcome::Advanced {
                from: ConversationState::AwaitingGreeting,
                to: ConversationState::AwaitingDate,
            }
        );
        assert_eq!(
            gate.advance("ask_date"),
            FlowOutcome::Advanced {
                from: ConversationState::AwaitingDate,
                to: ConversationState::Complete,
            }
        );
        assert_eq!(gate.state(), ConversationState::Complete);
    }

    #[test]
    fn test_out_of_order_intent_is_violation() {
        let mut gate = FlowGate::new();
        let outcome = gate.advance("ask_date");
        assert_eq!(
            outcome,
            FlowOutcome::Violation {
                state: ConversationState::AwaitingGreeting,
                intent: "ask_date".to_string(),
            }
        );
        assert_eq!(gate.state(), ConversationState::AwaitingGreeting);
    }

    #[test]
    fn test_repeated_intent_after_advance_is_violation() {
        let mut gate = FlowGate::new();
        gate.advance("greeting");
        let outcome = gate.advance("greeting");
        assert!(matches!(outcome, FlowOutcome::Violation { .. }));
        assert_eq!(gate.state(), ConversationState::AwaitingDate);
    }

    #[test]
    fn test_complete_absorbs_everything() {
        let mut gate = FlowGate::new();
        gate.advance("greeting");
        gate.advance("ask_date");

        assert_eq!(gate.advance("greeting"), FlowOutcome::Unchanged);
        assert_eq!(gate.advance("ask_date"), FlowOutcome::Unchanged);
        assert_eq!(gate.advance("anything"), FlowOutcome::Unchanged);
        assert_eq!(gate.state(), ConversationState::Complete);
    }

    #[test]
    fn test_non_flow_intent_leaves_state_unchanged() {
        let mut gate = FlowGate::new();
        assert_eq!(gate.advance("confirm"), FlowOutcome::Unchanged);
        assert_eq!(gate.state(), ConversationState::AwaitingGreeting);
    }

    #[test]
    fn test_states_never_decrease() {
        let mut gate = FlowGate::new();
        let mut previous = gate.state();
        for intent in ["ask_date", "greeting", "greeting", "ask_date", "other", "ask_date"] {
            gate.advance(intent);
            assert!(gate.state() >= previous, "state went backwards");
            previous = gate.state();
        }
    }
}
