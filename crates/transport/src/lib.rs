//! Wire transport for both call legs
//!
//! Message types and codecs for the two peers the relay bridges:
//! - Telephony media stream (WebSocket, JSON text frames, base64 µ-law)
//! - Speech-AI engine realtime socket (WebSocket, JSON text frames)

pub mod codec;
pub mod realtime;
pub mod telephony;

pub use codec::{decode, encode, transcode, ulaw_to_linear, linear_to_ulaw};
pub use realtime::{connect_engine, EngineCommand, EngineEvent, EngineSocket, SessionSettings};
pub use telephony::{MediaPayload, OutboundMessage, StreamStart, TelephonyMessage};
