//! Duplex relay coordinator
//!
//! Owns exactly one call. The inbound pump forwards caller audio to the
//! engine and publishes the session on stream start; the outbound pump
//! forwards engine audio to the telephony leg and drives the guardrail
//! validator and the flow gate. Either pump ending tears the other down via
//! a shared shutdown signal and by closing the opposite sink, so the pair
//! always finishes together and the session is finalized exactly once.
//!
//! Barge-in ordering holds because the outbound pump is a single task: the
//! telephony `clear` and the engine cancel are both written before the next
//! audio delta is even read.

use std::sync::Arc;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::{watch, Mutex};

use callbridge_agent::{instructions_for, FlowGate, FlowOutcome, SlotWindow};
use callbridge_core::{
    AudioEncoding, AudioFrame, ConversationState, SourceChannel, TranscriptEvent, TransportError,
};
use callbridge_guardrail::{GuardrailValidator, GuardrailVerdict};
use callbridge_transport::{
    codec, EngineCommand, EngineEvent, OutboundMessage, SessionSettings, TelephonyMessage,
};

use crate::links::{EngineSink, EngineStream, TelephonySink, TelephonyStream};
use crate::registry::SessionRegistry;
use crate::session::{CallSession, CallSummary};

/// Per-deployment relay settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Engine voice name.
    pub voice: String,
    /// Engine sampling temperature.
    pub temperature: f32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            voice: "echo".to_string(),
            temperature: 0.2,
        }
    }
}

/// Coordinator for one call's duplex relay.
pub struct RelayCoordinator {
    registry: Arc<SessionRegistry>,
    validator: GuardrailValidator,
    config: RelayConfig,
    /// Free windows offered once greeting is done; fetched before the call.
    slots: Vec<SlotWindow>,
    /// Calendar lookup failures recorded while preparing the call.
    calendar_errors: u32,
}

impl RelayCoordinator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        validator: GuardrailValidator,
        config: RelayConfig,
        slots: Vec<SlotWindow>,
        calendar_errors: u32,
    ) -> Self {
        Self {
            registry,
            validator,
            config,
            slots,
            calendar_errors,
        }
    }

    fn session_update(&self, state: ConversationState) -> EngineCommand {
        EngineCommand::SessionUpdate {
            session: SessionSettings::ulaw(
                &self.config.voice,
                self.config.temperature,
                instructions_for(state, &self.slots),
                state,
            ),
        }
    }

    /// Run both pumps to completion and finalize the session.
    ///
    /// Returns `None` when the call ended before the telephony stream ever
    /// started; otherwise the summary carries whatever was collected, fatal
    /// paths included.
    pub async fn run<TRx, TTx, ERx, ETx>(
        self,
        telephony_rx: TRx,
        mut telephony_tx: TTx,
        mut engine_rx: ERx,
        engine_tx: ETx,
    ) -> Option<CallSummary>
    where
        TRx: TelephonyStream + 'static,
        TTx: TelephonySink,
        ERx: EngineStream,
        ETx: EngineSink + 'static,
    {
        let engine_tx = Arc::new(Mutex::new(engine_tx));
        let session_cell: Arc<OnceLock<Arc<CallSession>>> = Arc::new(OnceLock::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // The engine needs its behavioral instructions before the first turn.
        let initial = self.session_update(ConversationState::AwaitingGreeting);
        if let Err(e) = engine_tx.lock().await.send(initial).await {
            tracing::error!(error = %e, "initial session update failed");
            let _ = telephony_tx.close().await;
            let _ = engine_tx.lock().await.close().await;
            return None;
        }

        let inbound = {
            let engine_tx = engine_tx.clone();
            let session_cell = session_cell.clone();
            let registry = self.registry.clone();
            let shutdown_tx = shutdown_tx.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                inbound_pump(telephony_rx, &engine_tx, &session_cell, &registry, &mut shutdown_rx)
                    .await;
                let _ = shutdown_tx.send(true);
                // Tear down the engine side so the outbound pump ends with us.
                if let Err(e) = engine_tx.lock().await.close().await {
                    tracing::debug!(error = %e, "engine close after inbound exit");
                }
            })
        };

        let mut outbound = OutboundPump {
            telephony_tx,
            engine_tx: engine_tx.clone(),
            session_cell: session_cell.clone(),
            gate: FlowGate::new(),
            pending: PendingLedger::default(),
            coordinator: &self,
        };
        outbound
            .run(&mut engine_rx, shutdown_rx.clone())
            .await;
        let _ = shutdown_tx.send(true);
        // Tear down the telephony side so the inbound pump ends with us.
        if let Err(e) = outbound.telephony_tx.close().await {
            tracing::debug!(error = %e, "telephony close after outbound exit");
        }

        if let Err(e) = inbound.await {
            tracing::error!(error = %e, "inbound pump task failed");
        }

        // Anything observed before the stream start frame is still pending;
        // fold it into the session before the summary is taken.
        outbound.flush_pending();

        match session_cell.get() {
            Some(session) => {
                self.registry.remove(session.call_id());
                let summary = session.finalize(self.calendar_errors);
                tracing::info!(
                    call_id = %summary.call_id,
                    duration_secs = summary.duration_secs(),
                    final_state = %summary.final_state,
                    transcripts = summary.transcripts.len(),
                    "call completed"
                );
                Some(summary)
            }
            None => {
                tracing::info!("call ended before the telephony stream started");
                None
            }
        }
    }
}

/// Telephony → engine pump.
///
/// Blocks only on "receive next message" and "send to engine". Codec errors
/// drop the single frame; engine send failures and telephony transport
/// errors end the call.
async fn inbound_pump<TRx, ETx>(
    mut telephony_rx: TRx,
    engine_tx: &Mutex<ETx>,
    session_cell: &OnceLock<Arc<CallSession>>,
    registry: &SessionRegistry,
    shutdown_rx: &mut watch::Receiver<bool>,
) where
    TRx: TelephonyStream,
    ETx: EngineSink,
{
    loop {
        let message = tokio::select! {
            _ = shutdown_rx.changed() => break,
            message = telephony_rx.recv() => message,
        };

        match message {
            Some(Ok(TelephonyMessage::Start { start })) => {
                let call_id = start
                    .call_sid
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let session = Arc::new(CallSession::new(call_id, start.stream_sid));
                tracing::info!(
                    call_id = %session.call_id(),
                    stream_sid = %session.stream_sid(),
                    "telephony stream started"
                );
                registry.insert(session.clone());
                if session_cell.set(session).is_err() {
                    tracing::warn!("duplicate stream start ignored");
                }
            }
            Some(Ok(TelephonyMessage::Media { media })) => {
                let frame = match media.decode() {
                    Ok(wire) => {
                        AudioFrame::new(wire, AudioEncoding::G711Ulaw, SourceChannel::Telephony)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed telephony frame");
                        continue;
                    }
                };
                // Same companding on both sides: pass-through re-encode.
                let frame = match codec::transcode(frame, AudioEncoding::G711Ulaw) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping untranscodable frame");
                        continue;
                    }
                };
                let command = EngineCommand::AudioAppend {
                    audio: BASE64.encode(&frame.bytes),
                };
                if let Err(e) = engine_tx.lock().await.send(command).await {
                    tracing::error!(error = %e, "engine send failed, ending call");
                    break;
                }
            }
            Some(Ok(TelephonyMessage::Stop)) => {
                tracing::info!("telephony stream stopped");
                break;
            }
            Some(Ok(TelephonyMessage::Unknown)) => {
                tracing::debug!("ignoring unconsumed telephony event");
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "telephony receive failed");
                break;
            }
            None => {
                tracing::info!("telephony peer disconnected");
                break;
            }
        }
    }
}

/// Turns observed before the telephony stream started. Flushed into the
/// session as soon as it is published; the engine occasionally emits its
/// session bookkeeping before the caller's leg is up.
#[derive(Default)]
struct PendingLedger {
    events: Vec<TranscriptEvent>,
    guardrail_rejects: u32,
    policy_rejects: u32,
    state_violations: u32,
}

impl PendingLedger {
    fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.guardrail_rejects == 0
            && self.policy_rejects == 0
            && self.state_violations == 0
    }
}

/// Engine → telephony pump state.
struct OutboundPump<'a, TTx, ETx> {
    telephony_tx: TTx,
    engine_tx: Arc<Mutex<ETx>>,
    session_cell: Arc<OnceLock<Arc<CallSession>>>,
    gate: FlowGate,
    pending: PendingLedger,
    coordinator: &'a RelayCoordinator,
}

impl<TTx, ETx> OutboundPump<'_, TTx, ETx>
where
    TTx: TelephonySink,
    ETx: EngineSink,
{
    async fn run<ERx: EngineStream>(
        &mut self,
        engine_rx: &mut ERx,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            let event = tokio::select! {
                _ = shutdown_rx.changed() => break,
                event = engine_rx.recv() => event,
            };

            match event {
                Some(Ok(event)) => {
                    if let Err(e) = self.handle(event).await {
                        tracing::error!(error = %e, "outbound pump failed, ending call");
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "engine receive failed");
                    break;
                }
                None => {
                    tracing::info!("engine disconnected");
                    break;
                }
            }
        }
    }

    fn session(&self) -> Option<&Arc<CallSession>> {
        self.session_cell.get()
    }

    /// Move anything observed before stream start onto the session.
    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Some(session) = self.session_cell.get() {
            let pending = std::mem::take(&mut self.pending);
            for event in pending.events {
                session.push_transcript(event);
            }
            session.add_guardrail_rejects(pending.guardrail_rejects);
            session.add_policy_rejects(pending.policy_rejects);
            session.add_state_violations(pending.state_violations);
            session.set_state(self.gate.state());
        }
    }

    async fn handle(&mut self, event: EngineEvent) -> Result<(), TransportError> {
        self.flush_pending();

        match event {
            EngineEvent::AudioDelta { delta } => self.forward_audio(&delta).await,
            EngineEvent::ItemCreated { raw } => self.gate_turn(raw).await,
            EngineEvent::SpeechStarted => self.barge_in().await,
            EngineEvent::SessionCreated { session_id } => {
                tracing::info!(session_id = session_id.as_deref().unwrap_or(""), "engine session created");
                Ok(())
            }
            EngineEvent::SessionUpdated => {
                tracing::debug!("engine acknowledged session update");
                Ok(())
            }
            EngineEvent::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "ignoring unconsumed engine event");
                Ok(())
            }
        }
    }

    async fn forward_audio(&mut self, delta: &str) -> Result<(), TransportError> {
        let frame = match BASE64.decode(delta) {
            Ok(bytes) => AudioFrame::new(bytes, AudioEncoding::G711Ulaw, SourceChannel::Engine),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed engine audio delta");
                return Ok(());
            }
        };
        let frame = match codec::transcode(frame, AudioEncoding::G711Ulaw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "dropping untranscodable engine frame");
                return Ok(());
            }
        };

        let Some(stream_sid) = self.session().map(|s| s.stream_sid().to_string()) else {
            tracing::debug!("audio delta before stream start dropped");
            return Ok(());
        };
        self.telephony_tx
            .send(OutboundMessage::media(stream_sid, &frame.bytes))
            .await
    }

    /// Validate one conversational turn and drive the flow gate.
    async fn gate_turn(&mut self, raw: serde_json::Value) -> Result<(), TransportError> {
        let verdict = self.coordinator.validator.validate(&raw);
        let record =
            TranscriptEvent::new(raw, verdict.intent().cloned(), verdict.verdict());
        match self.session() {
            Some(session) => session.push_transcript(record),
            None => self.pending.events.push(record),
        }

        match verdict {
            GuardrailVerdict::RejectedByPolicy { reason } => {
                tracing::warn!(reason = %reason, "policy rejection, cancelling generation");
                match self.session() {
                    Some(session) => session.add_policy_rejects(1),
                    None => self.pending.policy_rejects += 1,
                }
                self.engine_tx
                    .lock()
                    .await
                    .send(EngineCommand::ResponseCancel)
                    .await
            }
            GuardrailVerdict::RejectedByGuardrail { reason } => {
                tracing::warn!(reason = %reason, "guardrail rejection");
                match self.session() {
                    Some(session) => session.add_guardrail_rejects(1),
                    None => self.pending.guardrail_rejects += 1,
                }
                Ok(())
            }
            GuardrailVerdict::Accepted(extracted) => match self.gate.advance(&extracted.intent) {
                FlowOutcome::Advanced { from, to } => {
                    tracing::info!(%from, %to, intent = %extracted.intent, "flow advanced");
                    if let Some(session) = self.session() {
                        session.set_state(to);
                    }
                    let update = self.coordinator.session_update(to);
                    self.engine_tx.lock().await.send(update).await
                }
                FlowOutcome::Violation { state, intent } => {
                    tracing::warn!(%state, %intent, "state.violation");
                    match self.session() {
                        Some(session) => session.add_state_violations(1),
                        None => self.pending.state_violations += 1,
                    }
                    Ok(())
                }
                FlowOutcome::Unchanged => Ok(()),
            },
        }
    }

    /// Caller spoke over the engine: flush queued audio, then cancel the
    /// in-flight generation. Connections stay open for the next turn.
    async fn barge_in(&mut self) -> Result<(), TransportError> {
        match self.session().map(|s| s.stream_sid().to_string()) {
            Some(stream_sid) => {
                tracing::info!(stream_sid = %stream_sid, "caller barge-in, flushing outbound audio");
                self.telephony_tx
                    .send(OutboundMessage::clear(stream_sid))
                    .await?;
            }
            None => {
                tracing::debug!("barge-in before stream start; nothing to flush");
            }
        }
        self.engine_tx
            .lock()
            .await
            .send(EngineCommand::ResponseCancel)
            .await
    }
}
