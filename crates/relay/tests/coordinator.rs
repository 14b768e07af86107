//! Coordinator integration tests
//!
//! Drive the relay with channel-backed link fakes and assert on the exact
//! command sequences each peer observes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use callbridge_core::{ConversationState, TransportError, Verdict};
use callbridge_guardrail::{GuardrailRules, GuardrailValidator};
use callbridge_relay::{
    CallSummary, EngineSink, EngineStream, RelayConfig, RelayCoordinator, SessionRegistry,
    TelephonySink, TelephonyStream,
};
use callbridge_transport::{
    EngineCommand, EngineEvent, OutboundMessage, StreamStart, TelephonyMessage,
};

/// Shared, ordered log of everything both sinks observed.
#[derive(Clone, Default)]
struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    fn index_of(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    fn count_of(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }
}

struct ScriptedTelephony {
    rx: mpsc::Receiver<TelephonyMessage>,
}

#[async_trait]
impl TelephonyStream for ScriptedTelephony {
    async fn recv(&mut self) -> Option<Result<TelephonyMessage, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

struct RecordingTelephonySink {
    recorder: Recorder,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TelephonySink for RecordingTelephonySink {
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        match &message {
            OutboundMessage::Media { .. } => self.recorder.push("tel:media"),
            OutboundMessage::Clear { .. } => self.recorder.push("tel:clear"),
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedEngine {
    rx: mpsc::Receiver<EngineEvent>,
}

#[async_trait]
impl EngineStream for ScriptedEngine {
    async fn recv(&mut self) -> Option<Result<EngineEvent, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

struct RecordingEngineSink {
    recorder: Recorder,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl EngineSink for RecordingEngineSink {
    async fn send(&mut self, command: EngineCommand) -> Result<(), TransportError> {
        match &command {
            EngineCommand::SessionUpdate { .. } => self.recorder.push("eng:session.update"),
            EngineCommand::AudioAppend { .. } => self.recorder.push("eng:audio.append"),
            EngineCommand::ResponseCancel => self.recorder.push("eng:cancel"),
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    tel_tx: mpsc::Sender<TelephonyMessage>,
    eng_tx: mpsc::Sender<EngineEvent>,
    recorder: Recorder,
    registry: Arc<SessionRegistry>,
    tel_closed: Arc<AtomicBool>,
    eng_closed: Arc<AtomicBool>,
    run: tokio::task::JoinHandle<Option<CallSummary>>,
}

fn start_harness(rules: GuardrailRules) -> Harness {
    let (tel_tx, tel_rx) = mpsc::channel(16);
    let (eng_tx, eng_rx) = mpsc::channel(16);
    let recorder = Recorder::default();
    let registry = Arc::new(SessionRegistry::new());
    let tel_closed = Arc::new(AtomicBool::new(false));
    let eng_closed = Arc::new(AtomicBool::new(false));

    let coordinator = RelayCoordinator::new(
        registry.clone(),
        GuardrailValidator::new(&rules).unwrap(),
        RelayConfig::default(),
        Vec::new(),
        0,
    );
    let run = tokio::spawn(coordinator.run(
        ScriptedTelephony { rx: tel_rx },
        RecordingTelephonySink {
            recorder: recorder.clone(),
            closed: tel_closed.clone(),
        },
        ScriptedEngine { rx: eng_rx },
        RecordingEngineSink {
            recorder: recorder.clone(),
            closed: eng_closed.clone(),
        },
    ));

    Harness {
        tel_tx,
        eng_tx,
        recorder,
        registry,
        tel_closed,
        eng_closed,
        run,
    }
}

impl Harness {
    async fn start_stream(&self) {
        self.tel_tx
            .send(TelephonyMessage::Start {
                start: StreamStart {
                    stream_sid: "MZ1".to_string(),
                    call_sid: Some("CA1".to_string()),
                },
            })
            .await
            .unwrap();
        // The inbound pump publishes the session; wait for it so engine
        // events observe a started stream.
        wait_until(|| self.registry.count() == 1).await;
    }

    async fn turn(&self, text: &str) {
        self.eng_tx
            .send(EngineEvent::ItemCreated {
                raw: json!({
                    "type": "conversation.item.created",
                    "item": {"content": [{"type": "text", "text": text}]},
                }),
            })
            .await
            .unwrap();
    }

    /// Close the engine side and wait for the run to finish.
    async fn finish(self) -> Option<CallSummary> {
        drop(self.eng_tx);
        self.run.await.unwrap()
    }
}

async fn wait_until(predicate: impl Fn() -> bool) {
    for _ in 0..500 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn scripted_intent_sequence_reaches_complete() {
    let harness = start_harness(GuardrailRules::default());
    harness.start_stream().await;

    harness.turn(r#"{"intent":"greeting","text":"Hello, this is the review desk."}"#).await;
    harness.turn(r#"{"intent":"ask_date","text":"Which day works for you?"}"#).await;

    let recorder = harness.recorder.clone();
    let summary = harness.finish().await.expect("summary");

    assert_eq!(summary.final_state, ConversationState::Complete);
    assert_eq!(summary.transcripts.len(), 2);
    assert!(summary.transcripts.iter().all(|t| t.verdict == Verdict::Accepted));
    // Initial update plus one per forward transition.
    assert_eq!(recorder.count_of("eng:session.update"), 3);
}

#[tokio::test]
async fn out_of_order_intent_logs_violation_without_advancing() {
    let harness = start_harness(GuardrailRules::default());
    harness.start_stream().await;

    harness.turn(r#"{"intent":"ask_date","text":"Which day works for you?"}"#).await;

    let recorder = harness.recorder.clone();
    let summary = harness.finish().await.expect("summary");

    assert_eq!(summary.final_state, ConversationState::AwaitingGreeting);
    assert_eq!(summary.state_violations, 1);
    assert_eq!(summary.guardrail_rejects, 0);
    // Only the initial session update: violations re-send nothing.
    assert_eq!(recorder.count_of("eng:session.update"), 1);
}

#[tokio::test]
async fn policy_rejection_cancels_generation() {
    let rules = GuardrailRules {
        allowed_intents: vec!["greeting".to_string(), "ask_date".to_string()],
        disallowed_topics: Some("pricing|lawsuit".to_string()),
    };
    let harness = start_harness(rules);
    harness.start_stream().await;

    harness.turn(r#"{"intent":"greeting","text":"Let me explain our PRICING first."}"#).await;

    let recorder = harness.recorder.clone();
    let summary = harness.finish().await.expect("summary");

    assert_eq!(summary.policy_rejects, 1);
    assert_eq!(summary.guardrail_rejects, 0);
    assert_eq!(summary.calendar_errors, 0);
    assert_eq!(summary.final_state, ConversationState::AwaitingGreeting);
    assert_eq!(recorder.count_of("eng:cancel"), 1);
    // Nothing from the rejected turn reached the telephony side.
    assert_eq!(recorder.count_of("tel:media"), 0);
}

#[tokio::test]
async fn unparseable_turn_is_guardrail_rejected() {
    let harness = start_harness(GuardrailRules::default());
    harness.start_stream().await;

    harness.turn("I will just improvise something off-script").await;

    let summary = harness.finish().await.expect("summary");
    assert_eq!(summary.guardrail_rejects, 1);
    assert_eq!(summary.final_state, ConversationState::AwaitingGreeting);
    assert_eq!(summary.transcripts.len(), 1);
    assert_eq!(summary.transcripts[0].verdict, Verdict::RejectedByGuardrail);
    assert!(summary.transcripts[0].extracted.is_none());
}

#[tokio::test]
async fn barge_in_flushes_before_cancelling() {
    let harness = start_harness(GuardrailRules::default());
    harness.start_stream().await;

    let delta = |bytes: &[u8]| EngineEvent::AudioDelta {
        delta: {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD.encode(bytes)
        },
    };
    harness.eng_tx.send(delta(&[1, 2, 3])).await.unwrap();
    harness.eng_tx.send(EngineEvent::SpeechStarted).await.unwrap();
    harness.eng_tx.send(delta(&[4, 5, 6])).await.unwrap();

    let recorder = harness.recorder.clone();
    harness.finish().await.expect("summary");

    let entries = recorder.entries();
    let clear = recorder.index_of("tel:clear").expect("clear sent");
    let cancel = recorder.index_of("eng:cancel").expect("cancel sent");
    let last_media = entries
        .iter()
        .rposition(|e| e == "tel:media")
        .expect("media forwarded");
    // Flush, then cancel, strictly before any later delta is forwarded.
    assert!(clear < cancel, "clear must precede cancel: {entries:?}");
    assert!(cancel < last_media, "post-barge-in delta must follow cancel: {entries:?}");
    assert_eq!(recorder.count_of("tel:media"), 2);
}

#[tokio::test]
async fn malformed_audio_delta_is_dropped_not_fatal() {
    let harness = start_harness(GuardrailRules::default());
    harness.start_stream().await;

    harness
        .eng_tx
        .send(EngineEvent::AudioDelta {
            delta: "@@not-base64@@".to_string(),
        })
        .await
        .unwrap();
    harness
        .eng_tx
        .send(EngineEvent::AudioDelta {
            delta: {
                use base64::Engine as _;
                base64::engine::general_purpose::STANDARD.encode([7u8, 8, 9])
            },
        })
        .await
        .unwrap();

    let recorder = harness.recorder.clone();
    harness.finish().await.expect("summary");

    // The bad frame was dropped, the good one still relayed.
    assert_eq!(recorder.count_of("tel:media"), 1);
}

#[tokio::test]
async fn telephony_close_tears_down_engine_and_finalizes() {
    let harness = start_harness(GuardrailRules::default());
    harness.start_stream().await;

    harness.turn(r#"{"intent":"greeting","text":"Hello there."}"#).await;
    wait_until({
        let recorder = harness.recorder.clone();
        move || recorder.count_of("eng:session.update") == 2
    })
    .await;

    // Telephony hangs up while the engine connection is still open.
    let Harness {
        tel_tx,
        eng_tx,
        registry,
        eng_closed,
        tel_closed: _tel_closed,
        recorder: _recorder,
        run,
    } = harness;
    drop(tel_tx);

    let summary = run.await.unwrap().expect("summary");
    // Keep the engine sender alive until the run finished, proving teardown
    // came from the coordinator rather than an engine EOF.
    drop(eng_tx);

    assert!(eng_closed.load(Ordering::SeqCst), "engine must be closed by the coordinator");
    assert_eq!(summary.transcripts.len(), 1);
    assert_eq!(summary.final_state, ConversationState::AwaitingDate);
    assert_eq!(registry.count(), 0, "session removed at teardown");
}

#[tokio::test]
async fn ungated_configuration_relays_audio_without_advancing() {
    let harness = start_harness(GuardrailRules::ungated());
    harness.start_stream().await;

    harness.turn(r#"{"intent":"greeting","text":"Hello."}"#).await;
    harness
        .eng_tx
        .send(EngineEvent::AudioDelta {
            delta: {
                use base64::Engine as _;
                base64::engine::general_purpose::STANDARD.encode([1u8, 2])
            },
        })
        .await
        .unwrap();

    let recorder = harness.recorder.clone();
    let summary = harness.finish().await.expect("summary");

    assert_eq!(summary.final_state, ConversationState::AwaitingGreeting);
    assert_eq!(summary.guardrail_rejects, 1);
    assert_eq!(recorder.count_of("tel:media"), 1);
    assert_eq!(recorder.count_of("eng:session.update"), 1);
}

#[tokio::test]
async fn caller_media_is_forwarded_to_engine() {
    let harness = start_harness(GuardrailRules::default());
    harness.start_stream().await;

    harness
        .tel_tx
        .send(TelephonyMessage::Media {
            media: callbridge_transport::MediaPayload {
                payload: {
                    use base64::Engine as _;
                    base64::engine::general_purpose::STANDARD.encode([0xFFu8; 160])
                },
            },
        })
        .await
        .unwrap();

    wait_until({
        let recorder = harness.recorder.clone();
        move || recorder.count_of("eng:audio.append") == 1
    })
    .await;

    harness.finish().await.expect("summary");
}
