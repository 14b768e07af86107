//! Guardrail validation for engine output
//!
//! Constrains what the speech-AI engine is allowed to say. Two independent
//! checks, both pure functions of the turn payload:
//!
//! 1. A policy scan of the raw turn text against a configured
//!    disallowed-topics pattern. A match rejects the turn outright and
//!    short-circuits before intent handling.
//! 2. Structured `{intent, text}` extraction, accepted only when the intent
//!    is in the configured whitelist. Fails closed: a turn that cannot be
//!    parsed, or whose intent is unknown, is rejected and its intent is
//!    discarded.
//!
//! The caller owns logging and counters; nothing here has side effects.

mod intent;
mod rules;

pub use intent::{extract, item_text};
pub use rules::{load_rules, GuardrailRules};

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use thiserror::Error;

use callbridge_core::{ExtractedIntent, Verdict};

/// Guardrail failures. Parse failures are folded into verdicts by the
/// validator; only pattern compilation surfaces to the caller.
#[derive(Error, Debug)]
pub enum GuardrailError {
    #[error("turn carries no text content")]
    MissingText,

    #[error("structured output is not an {{intent, text}} record: {0}")]
    Malformed(String),

    #[error("invalid disallowed-topics pattern: {0}")]
    Pattern(String),

    #[error("failed to load rules: {0}")]
    Rules(String),
}

/// Outcome of validating one engine turn.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardrailVerdict {
    /// Intent extracted and whitelisted.
    Accepted(ExtractedIntent),
    /// Parse failure or non-whitelisted intent.
    RejectedByGuardrail { reason: String },
    /// Disallowed topic matched; the turn must not reach the caller.
    RejectedByPolicy { reason: String },
}

impl GuardrailVerdict {
    /// The transcript verdict for this outcome.
    pub fn verdict(&self) -> Verdict {
        match self {
            GuardrailVerdict::Accepted(_) => Verdict::Accepted,
            GuardrailVerdict::RejectedByGuardrail { .. } => Verdict::RejectedByGuardrail,
            GuardrailVerdict::RejectedByPolicy { .. } => Verdict::RejectedByPolicy,
        }
    }

    /// The extracted intent, present only on acceptance.
    pub fn intent(&self) -> Option<&ExtractedIntent> {
        match self {
            GuardrailVerdict::Accepted(extracted) => Some(extracted),
            _ => None,
        }
    }
}

/// Validates engine turns against a whitelist and a content policy.
pub struct GuardrailValidator {
    allowed: HashSet<String>,
    policy: Option<Regex>,
}

impl GuardrailValidator {
    /// Build a validator from rules. Fails only on an invalid policy pattern.
    pub fn new(rules: &GuardrailRules) -> Result<Self, GuardrailError> {
        let policy = match &rules.disallowed_topics {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| GuardrailError::Pattern(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            allowed: rules.allowed_intents.iter().cloned().collect(),
            policy,
        })
    }

    /// Validate one engine turn payload.
    pub fn validate(&self, raw: &Value) -> GuardrailVerdict {
        // Policy scan runs first, over the raw text, regardless of whether
        // the turn parses as structured output.
        if let Some(pattern) = &self.policy {
            if let Some(text) = intent::item_text(raw) {
                if pattern.is_match(&text) {
                    return GuardrailVerdict::RejectedByPolicy {
                        reason: format!("disallowed topic matched pattern `{}`", pattern.as_str()),
                    };
                }
            }
        }

        match intent::extract(raw) {
            Ok(extracted) if self.allowed.contains(&extracted.intent) => {
                GuardrailVerdict::Accepted(extracted)
            }
            Ok(extracted) => GuardrailVerdict::RejectedByGuardrail {
                reason: format!("intent `{}` is not whitelisted", extracted.intent),
            },
            Err(e) => GuardrailVerdict::RejectedByGuardrail {
                reason: e.to_string(),
            },
        }
    }
}
