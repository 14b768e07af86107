//! Guardrail rules definition and loading

use serde::{Deserialize, Serialize};

use crate::GuardrailError;

/// Guardrail rules for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailRules {
    /// Intents the engine is allowed to emit.
    #[serde(default = "default_intents")]
    pub allowed_intents: Vec<String>,
    /// Case-insensitive pattern for disallowed topics; `None` disables the
    /// policy scan.
    #[serde(default)]
    pub disallowed_topics: Option<String>,
}

fn default_intents() -> Vec<String> {
    vec!["greeting".to_string(), "ask_date".to_string()]
}

impl Default for GuardrailRules {
    fn default() -> Self {
        Self {
            allowed_intents: default_intents(),
            disallowed_topics: None,
        }
    }
}

impl GuardrailRules {
    /// The ungated reduced configuration: nothing is whitelisted and no
    /// policy is scanned, so every turn fails closed and the flow gate never
    /// advances while audio keeps relaying.
    pub fn ungated() -> Self {
        Self {
            allowed_intents: Vec::new(),
            disallowed_topics: None,
        }
    }
}

/// Load rules from a TOML file.
pub fn load_rules(path: &str) -> Result<GuardrailRules, GuardrailError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| GuardrailError::Rules(e.to_string()))?;
    toml::from_str(&content).map_err(|e| GuardrailError::Rules(e.to_string()))
}
