//! Call session state
//!
//! One `CallSession` per active call. The identifiers and start timestamp
//! are set once at construction, before the session is published to the
//! registry; everything else is mutated only by the outbound pump.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use callbridge_core::{ConversationState, TranscriptEvent};

/// Per-call state shared between the coordinator's pumps and the registry.
pub struct CallSession {
    call_id: String,
    stream_sid: String,
    started_at: DateTime<Utc>,
    state: RwLock<ConversationState>,
    transcripts: RwLock<Vec<TranscriptEvent>>,
    guardrail_rejects: AtomicU32,
    policy_rejects: AtomicU32,
    state_violations: AtomicU32,
}

impl CallSession {
    /// Create a session at stream start.
    pub fn new(call_id: impl Into<String>, stream_sid: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            stream_sid: stream_sid.into(),
            started_at: Utc::now(),
            state: RwLock::new(ConversationState::default()),
            transcripts: RwLock::new(Vec::new()),
            guardrail_rejects: AtomicU32::new(0),
            policy_rejects: AtomicU32::new(0),
            state_violations: AtomicU32::new(0),
        }
    }

    /// Call identifier; stable for the call's lifetime.
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Stream identifier addressing outbound media to this leg.
    pub fn stream_sid(&self) -> &str {
        &self.stream_sid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current conversation state.
    pub fn state(&self) -> ConversationState {
        *self.state.read()
    }

    /// Record a state transition. Outbound pump only.
    pub fn set_state(&self, state: ConversationState) {
        *self.state.write() = state;
    }

    /// Append one transcript event. Outbound pump only; events are never
    /// mutated after append.
    pub fn push_transcript(&self, event: TranscriptEvent) {
        self.transcripts.write().push(event);
    }

    /// Number of recorded transcript events.
    pub fn transcript_len(&self) -> usize {
        self.transcripts.read().len()
    }

    pub fn add_guardrail_rejects(&self, n: u32) {
        self.guardrail_rejects.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_policy_rejects(&self, n: u32) {
        self.policy_rejects.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_state_violations(&self, n: u32) {
        self.state_violations.fetch_add(n, Ordering::Relaxed);
    }

    pub fn guardrail_rejects(&self) -> u32 {
        self.guardrail_rejects.load(Ordering::Relaxed)
    }

    pub fn policy_rejects(&self) -> u32 {
        self.policy_rejects.load(Ordering::Relaxed)
    }

    pub fn state_violations(&self) -> u32 {
        self.state_violations.load(Ordering::Relaxed)
    }

    /// Snapshot the session into its final summary, stamping the end time.
    ///
    /// Called exactly once, after both pumps have been joined, so every
    /// fatal path still yields a record with whatever was collected.
    pub fn finalize(&self, calendar_errors: u32) -> CallSummary {
        CallSummary {
            call_id: self.call_id.clone(),
            stream_sid: self.stream_sid.clone(),
            started_at: self.started_at,
            ended_at: Utc::now(),
            final_state: self.state(),
            transcripts: self.transcripts.read().clone(),
            guardrail_rejects: self.guardrail_rejects(),
            policy_rejects: self.policy_rejects(),
            state_violations: self.state_violations(),
            calendar_errors,
        }
    }
}

/// Immutable record of a finished call, handed to the metrics collaborator.
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub call_id: String,
    pub stream_sid: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub final_state: ConversationState,
    pub transcripts: Vec<TranscriptEvent>,
    pub guardrail_rejects: u32,
    pub policy_rejects: u32,
    pub state_violations: u32,
    pub calendar_errors: u32,
}

impl CallSummary {
    /// Call duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.ended_at - self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0
    }
}
