//! Transcript records
//!
//! Each engine-emitted conversational turn is recorded on the owning call
//! session and never mutated after append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validation verdict attached to a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Intent extracted and whitelisted; forwarded to the flow gate.
    Accepted,
    /// Parse failure or non-whitelisted intent; the turn did not reach the
    /// flow gate.
    RejectedByGuardrail,
    /// Disallowed topic matched; generation was cancelled.
    RejectedByPolicy,
}

/// Structured `{intent, text}` record extracted from an engine turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedIntent {
    /// Intent name, matched against the configured whitelist.
    pub intent: String,
    /// The utterance text the engine attached to the intent.
    pub text: String,
}

/// One engine-emitted conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Raw engine payload as received.
    pub raw: Value,
    /// Extracted intent record; `None` when the turn was rejected.
    pub extracted: Option<ExtractedIntent>,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
    /// Validation outcome for the turn.
    pub verdict: Verdict,
}

impl TranscriptEvent {
    /// Record a turn, stamping it with the current time.
    pub fn new(raw: Value, extracted: Option<ExtractedIntent>, verdict: Verdict) -> Self {
        Self {
            raw,
            extracted,
            timestamp: Utc::now(),
            verdict,
        }
    }

    /// Whether the turn passed validation.
    pub fn accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}
