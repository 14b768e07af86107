//! Application state
//!
//! Shared state across all handlers.

use std::sync::Arc;

use callbridge_agent::{HttpCalendarProvider, SlotProvider};
use callbridge_config::Settings;
use callbridge_guardrail::GuardrailRules;
use callbridge_relay::SessionRegistry;

use crate::storage::SummaryStore;
use crate::ServerError;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Active call sessions
    pub registry: Arc<SessionRegistry>,
    /// Call summary store
    pub store: Arc<SummaryStore>,
    /// Calendar collaborator; `None` offers no slots.
    pub slots: Option<Arc<dyn SlotProvider>>,
    /// Outbound HTTP client for call placement.
    pub http: reqwest::Client,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Settings) -> Result<Self, ServerError> {
        let store = SummaryStore::open(&config.storage.database_path)?;
        let slots: Option<Arc<dyn SlotProvider>> = if config.calendar.enabled {
            Some(Arc::new(HttpCalendarProvider::new(
                config.calendar.api_base.clone(),
                config.calendar.calendar_id.clone(),
                config.calendar.access_token.clone(),
                config.calendar.slot_minutes,
                config.calendar.day_start_hour,
                config.calendar.day_end_hour,
            )))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            store: Arc::new(store),
            slots,
            http: reqwest::Client::new(),
        })
    }

    /// Resolve the guardrail rules for a call.
    ///
    /// A configured rules file wins; on load failure the inline configuration
    /// applies so a bad file degrades rather than opening the gate.
    pub fn guardrail_rules(&self) -> GuardrailRules {
        let guardrail = &self.config.guardrail;
        if let Some(path) = &guardrail.rules_file {
            match callbridge_guardrail::load_rules(path) {
                Ok(rules) => return rules,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path,
                        "failed to load guardrail rules file, using inline configuration"
                    );
                }
            }
        }
        GuardrailRules {
            allowed_intents: guardrail.allowed_intents.clone(),
            disallowed_topics: guardrail.disallowed_topics.clone(),
        }
    }
}
