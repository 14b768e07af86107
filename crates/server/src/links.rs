//! Real link adapters
//!
//! Bind the relay's link traits to the actual socket halves: the axum
//! WebSocket facing the telephony provider and the tungstenite socket facing
//! the engine. Frames that fail to parse are skipped with a warning; only
//! socket-level failures surface as transport errors.

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;

use callbridge_core::TransportError;
use callbridge_relay::{EngineSink, EngineStream, TelephonySink, TelephonyStream};
use callbridge_transport::{EngineCommand, EngineEvent, EngineSocket, OutboundMessage, TelephonyMessage};

/// Receiving half of the telephony WebSocket.
pub struct AxumTelephonyStream {
    pub inner: SplitStream<WebSocket>,
}

#[async_trait]
impl TelephonyStream for AxumTelephonyStream {
    async fn recv(&mut self) -> Option<Result<TelephonyMessage, TransportError>> {
        loop {
            match self.inner.next().await {
                None => return None,
                Some(Err(e)) => return Some(Err(TransportError::Protocol(e.to_string()))),
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<TelephonyMessage>(&text) {
                        Ok(message) => return Some(Ok(message)),
                        Err(e) => {
                            tracing::warn!(error = %e, "skipping unparseable telephony frame");
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) => return None,
                // Ping/pong are answered by axum; binary frames are not part
                // of the stream protocol.
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Sending half of the telephony WebSocket.
pub struct AxumTelephonySink {
    pub inner: SplitSink<WebSocket, WsMessage>,
}

#[async_trait]
impl TelephonySink for AxumTelephonySink {
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        let json =
            serde_json::to_string(&message).map_err(|e| TransportError::Send(e.to_string()))?;
        self.inner
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Receiving half of the engine socket.
pub struct WsEngineStream {
    pub inner: SplitStream<EngineSocket>,
}

#[async_trait]
impl EngineStream for WsEngineStream {
    async fn recv(&mut self) -> Option<Result<EngineEvent, TransportError>> {
        loop {
            match self.inner.next().await {
                None => return None,
                Some(Err(e)) => return Some(Err(TransportError::Protocol(e.to_string()))),
                Some(Ok(TungsteniteMessage::Text(text))) => match EngineEvent::parse(&text) {
                    Ok(event) => return Some(Ok(event)),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unparseable engine frame");
                    }
                },
                Some(Ok(TungsteniteMessage::Close(_))) => return None,
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Sending half of the engine socket.
pub struct WsEngineSink {
    pub inner: SplitSink<EngineSocket, TungsteniteMessage>,
}

#[async_trait]
impl EngineSink for WsEngineSink {
    async fn send(&mut self, command: EngineCommand) -> Result<(), TransportError> {
        let json =
            serde_json::to_string(&command).map_err(|e| TransportError::Send(e.to_string()))?;
        self.inner
            .send(TungsteniteMessage::Text(json.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}
