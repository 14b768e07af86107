//! Telephony media stream messages
//!
//! JSON text frames exchanged with the telephony provider's stream socket.
//! Inbound carries stream lifecycle and base64 µ-law media; outbound carries
//! media addressed by stream identifier plus the `clear` flush used on
//! barge-in.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use callbridge_core::CodecError;

/// Message received from the telephony stream socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyMessage {
    /// Stream opened; carries the identifiers for this call leg.
    Start { start: StreamStart },
    /// One media frame of base64-encoded wire audio.
    Media { media: MediaPayload },
    /// Stream closed by the provider.
    Stop,
    /// Any event this relay does not consume (marks, DTMF, ...).
    #[serde(other)]
    Unknown,
}

/// Identifiers announced at stream start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamStart {
    /// Opaque provider-assigned id addressing outbound media to this leg.
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    /// The call identifier; stable for the call's lifetime.
    #[serde(rename = "callSid")]
    pub call_sid: Option<String>,
}

/// Base64-encoded wire audio payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaPayload {
    pub payload: String,
}

impl MediaPayload {
    /// Decode the base64 payload to raw wire bytes.
    pub fn decode(&self) -> Result<Vec<u8>, CodecError> {
        BASE64
            .decode(&self.payload)
            .map_err(|e| CodecError::Base64(e.to_string()))
    }
}

/// Message sent to the telephony stream socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Media frame addressed to a stream.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
    /// Flush any audio the provider has queued for the stream.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

impl OutboundMessage {
    /// Build a media frame from raw wire bytes.
    pub fn media(stream_sid: impl Into<String>, wire_bytes: &[u8]) -> Self {
        OutboundMessage::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: BASE64.encode(wire_bytes),
            },
        }
    }

    /// Build a clear (flush) message for a stream.
    pub fn clear(stream_sid: impl Into<String>) -> Self {
        OutboundMessage::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}
