//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP/WS server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Telephony provider configuration
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Speech-AI engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Guardrail configuration
    #[serde(default)]
    pub guardrail: GuardrailConfig,

    /// Calendar collaborator configuration
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Summary storage and report output
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Load settings from an optional TOML file plus the environment.
    ///
    /// Environment variables use the `CALLBRIDGE_` prefix with `__` as the
    /// section separator, e.g. `CALLBRIDGE_ENGINE__API_KEY`.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let config = builder
            .add_source(Environment::with_prefix("CALLBRIDGE").separator("__"))
            .build()?;
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings that cannot be checked by deserialization alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.engine.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "engine.temperature".to_string(),
                message: "must be between 0.0 and 2.0".to_string(),
            });
        }
        if self.calendar.slot_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "calendar.slot_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.calendar.day_start_hour >= self.calendar.day_end_hour {
            return Err(ConfigError::InvalidValue {
                field: "calendar.day_start_hour".to_string(),
                message: "must be before calendar.day_end_hour".to_string(),
            });
        }
        if self.engine.api_key.is_empty() {
            tracing::warn!("engine.api_key is empty; the engine connection will be refused");
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5050
}

/// Telephony provider credentials and addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// REST API base for call placement.
    #[serde(default = "default_telephony_api")]
    pub api_base: String,

    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub auth_token: String,

    /// Caller id for outbound calls.
    #[serde(default)]
    pub phone_number: String,

    /// Publicly reachable base URL of this server, used in the call webhook.
    #[serde(default)]
    pub public_url: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            api_base: default_telephony_api(),
            account_sid: String::new(),
            auth_token: String::new(),
            phone_number: String::new(),
            public_url: String::new(),
        }
    }
}

fn default_telephony_api() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

/// Speech-AI engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Realtime socket URL, including the model selector.
    #[serde(default = "default_engine_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            api_key: String::new(),
            voice: default_voice(),
            temperature: default_temperature(),
        }
    }
}

fn default_engine_url() -> String {
    "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-10-01&response_format=json"
        .to_string()
}

fn default_voice() -> String {
    "echo".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

/// Guardrail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Intents the engine is allowed to emit.
    #[serde(default = "default_intents")]
    pub allowed_intents: Vec<String>,

    /// Case-insensitive disallowed-topics pattern; unset disables the scan.
    #[serde(default)]
    pub disallowed_topics: Option<String>,

    /// Optional TOML rules file overriding the inline lists.
    #[serde(default)]
    pub rules_file: Option<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            allowed_intents: default_intents(),
            disallowed_topics: None,
            rules_file: None,
        }
    }
}

fn default_intents() -> Vec<String> {
    vec!["greeting".to_string(), "ask_date".to_string()]
}

/// Calendar collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Disables the lookup entirely when false; no slots are offered.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_calendar_api")]
    pub api_base: String,

    #[serde(default)]
    pub calendar_id: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: i64,

    #[serde(default = "default_day_start")]
    pub day_start_hour: u32,

    #[serde(default = "default_day_end")]
    pub day_end_hour: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_calendar_api(),
            calendar_id: String::new(),
            access_token: String::new(),
            slot_minutes: default_slot_minutes(),
            day_start_hour: default_day_start(),
            day_end_hour: default_day_end(),
        }
    }
}

fn default_calendar_api() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_slot_minutes() -> i64 {
    30
}

fn default_day_start() -> u32 {
    9
}

fn default_day_end() -> u32 {
    17
}

/// Summary storage and report output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            reports_dir: default_reports_dir(),
        }
    }
}

fn default_database_path() -> String {
    "calls.db".to_string()
}

fn default_reports_dir() -> String {
    "reports".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
