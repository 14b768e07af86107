//! Engine instructions per flow state
//!
//! The instruction text re-sent to the engine at session start and on every
//! forward transition, so the next turn reflects the new state.

use callbridge_core::ConversationState;

use crate::calendar::SlotWindow;

/// Base system script sent with every update.
const SYSTEM_PROMPT: &str = include_str!("../prompts/system_prompt.txt");

/// Stage guidance appended to the base script.
fn guidance(state: ConversationState) -> &'static str {
    match state {
        ConversationState::AwaitingGreeting => {
            "Open the call: greet the customer, give your name and the reason \
             for the call. Do not offer dates yet."
        }
        ConversationState::AwaitingDate => {
            "Greeting is done. Offer the available appointment slots listed \
             below and ask which day suits the customer."
        }
        ConversationState::Complete => {
            "The appointment request has been made. Confirm, thank the \
             customer, and wrap up the call."
        }
    }
}

/// Render the full instructions for a flow state.
///
/// Slots are included only once greeting is done; an empty slot list renders
/// an explicit no-availability line rather than an empty bullet list.
pub fn instructions_for(state: ConversationState, slots: &[SlotWindow]) -> String {
    let mut text = format!("{}\n\n{}", SYSTEM_PROMPT.trim(), guidance(state));

    if state >= ConversationState::AwaitingDate {
        if slots.is_empty() {
            text.push_str("\n\nNo slots are available today; apologize and offer a callback.");
        } else {
            text.push_str("\n\nToday's available slots:\n");
            for slot in slots {
                text.push_str(&format!("- {}\n", slot.display()));
            }
        }
    }

    text
}
