//! Link traits
//!
//! Abstract interfaces over the two peers' sockets. The server wires real
//! WebSocket halves behind these; tests drive the coordinator with channel
//! fakes. Receive returns `None` when the peer closed; sink errors are
//! fatal to the call.

use async_trait::async_trait;

use callbridge_core::TransportError;
use callbridge_transport::{EngineCommand, EngineEvent, OutboundMessage, TelephonyMessage};

/// Receiving half of the telephony stream socket.
#[async_trait]
pub trait TelephonyStream: Send {
    /// Next message from the telephony peer; `None` when the peer closed.
    async fn recv(&mut self) -> Option<Result<TelephonyMessage, TransportError>>;
}

/// Sending half of the telephony stream socket.
#[async_trait]
pub trait TelephonySink: Send {
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Close the telephony connection if still open.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Receiving half of the engine socket.
#[async_trait]
pub trait EngineStream: Send {
    /// Next event from the engine; `None` when the engine closed.
    async fn recv(&mut self) -> Option<Result<EngineEvent, TransportError>>;
}

/// Sending half of the engine socket.
#[async_trait]
pub trait EngineSink: Send {
    async fn send(&mut self, command: EngineCommand) -> Result<(), TransportError>;

    /// Close the engine connection if still open.
    async fn close(&mut self) -> Result<(), TransportError>;
}
