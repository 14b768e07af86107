//! Speech-AI engine realtime protocol
//!
//! JSON text frames on the engine's streaming socket. Outbound commands are
//! typed; inbound events are dispatched on their `type` string so unknown
//! event types can be logged and ignored rather than failing the stream.

use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use callbridge_core::{ConversationState, TransportError};

/// Connected engine socket.
pub type EngineSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Event received from the engine socket.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Engine session established.
    SessionCreated { session_id: Option<String> },
    /// Engine acknowledged a session update.
    SessionUpdated,
    /// One chunk of base64 wire audio from the current response.
    AudioDelta { delta: String },
    /// A conversational turn was created; payload structure is
    /// engine-version-dependent, so the raw value is kept.
    ItemCreated { raw: Value },
    /// The caller started speaking over the engine (barge-in trigger).
    SpeechStarted,
    /// Any event type this relay does not consume.
    Ignored { event_type: String },
}

impl EngineEvent {
    /// Parse one engine text frame.
    ///
    /// Frames that are not JSON objects are protocol errors; recognized types
    /// with a missing payload field and unrecognized types both map to
    /// `Ignored` so the pump can log and continue.
    pub fn parse(text: &str) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| TransportError::Protocol(format!("engine frame is not JSON: {e}")))?;
        let event_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(match event_type.as_str() {
            "session.created" => EngineEvent::SessionCreated {
                session_id: value
                    .pointer("/session/id")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            "session.updated" => EngineEvent::SessionUpdated,
            "response.audio.delta" => match value.get("delta").and_then(Value::as_str) {
                Some(delta) => EngineEvent::AudioDelta {
                    delta: delta.to_string(),
                },
                None => EngineEvent::Ignored { event_type },
            },
            "conversation.item.created" => EngineEvent::ItemCreated { raw: value },
            "input_audio_buffer.speech_started" => EngineEvent::SpeechStarted,
            _ => EngineEvent::Ignored { event_type },
        })
    }
}

/// Command sent to the engine socket.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum EngineCommand {
    /// (Re-)issue the behavioral instructions for the session.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionSettings },
    /// Append caller audio to the engine's input buffer.
    #[serde(rename = "input_audio_buffer.append")]
    AudioAppend { audio: String },
    /// Cancel the in-flight response generation.
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

/// Session settings carried by a `session.update`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSettings {
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub voice: String,
    pub instructions: String,
    pub modalities: Vec<String>,
    pub temperature: f32,
    pub state: ConversationState,
}

impl SessionSettings {
    /// Settings for this deployment: µ-law on both sides, text+audio out.
    pub fn ulaw(
        voice: impl Into<String>,
        temperature: f32,
        instructions: impl Into<String>,
        state: ConversationState,
    ) -> Self {
        Self {
            input_audio_format: "g711_ulaw".to_string(),
            output_audio_format: "g711_ulaw".to_string(),
            voice: voice.into(),
            instructions: instructions.into(),
            modalities: vec!["text".to_string(), "audio".to_string()],
            temperature,
            state,
        }
    }
}

/// Connect to the engine's realtime socket with auth headers applied.
pub async fn connect_engine(url: &str, api_key: &str) -> Result<EngineSocket, TransportError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::ConnectionFailed(format!("bad engine url: {e}")))?;

    let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|e| TransportError::ConnectionFailed(format!("bad api key: {e}")))?;
    request.headers_mut().insert("Authorization", auth);
    request
        .headers_mut()
        .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    let (socket, _response) = connect_async(request)
        .await
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
    Ok(socket)
}
