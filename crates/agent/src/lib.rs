//! Conversation flow control
//!
//! The scripted side of the call: the forward-only flow gate that tracks
//! what the engine is allowed to say next, the instruction text re-issued to
//! the engine on every transition, and the calendar collaborator that feeds
//! free slots into those instructions.

pub mod calendar;
pub mod flow;
pub mod instructions;

pub use calendar::{
    slots_or_empty, subtract_busy, CalendarError, HttpCalendarProvider, SlotProvider, SlotWindow,
    StaticSlotProvider,
};
pub use flow::{FlowGate, FlowOutcome};
pub use instructions::instructions_for;
