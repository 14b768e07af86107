//! Duplex relay between the telephony stream and the speech-AI engine
//!
//! One `RelayCoordinator` per call owns the `CallSession` and runs two
//! concurrent pumps: inbound (telephony → engine) and outbound (engine →
//! telephony). The outbound pump is the only writer of conversation state,
//! transcripts and counters; the inbound pump sets the write-once stream
//! identifiers before the session is published to the `SessionRegistry`.
//!
//! There is no internal queueing between receive and send: each pump blocks
//! on its sink, so a slow peer throttles the producer instead of growing a
//! buffer. The only intentional drop is the clear-on-barge-in flush.

pub mod coordinator;
pub mod links;
pub mod registry;
pub mod session;

pub use coordinator::{RelayConfig, RelayCoordinator};
pub use links::{EngineSink, EngineStream, TelephonySink, TelephonyStream};
pub use registry::SessionRegistry;
pub use session::{CallSession, CallSummary};
