//! Core types for the callbridge relay
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation flow state
//! - Audio frame types
//! - Transcript records
//! - Error taxonomy

pub mod audio;
pub mod conversation;
pub mod error;
pub mod transcript;

pub use audio::{AudioEncoding, AudioFrame, SourceChannel};
pub use conversation::ConversationState;
pub use error::{CodecError, Error, Result, TransportError};
pub use transcript::{ExtractedIntent, TranscriptEvent, Verdict};
