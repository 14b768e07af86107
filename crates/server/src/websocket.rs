//! Media stream handler
//!
//! Accepts the telephony provider's WebSocket, dials the engine, and hands
//! both sockets to a relay coordinator. When the relay finishes, the call is
//! finalized: metrics computed, report written, summary row persisted.

use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures_util::StreamExt;

use callbridge_agent::slots_or_empty;
use callbridge_guardrail::GuardrailValidator;
use callbridge_relay::{CallSummary, RelayConfig, RelayCoordinator};
use callbridge_transport::connect_engine;

use crate::links::{AxumTelephonySink, AxumTelephonyStream, WsEngineSink, WsEngineStream};
use crate::state::AppState;
use crate::{report, storage};

/// WebSocket upgrade for the telephony media stream.
pub async fn media_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| relay_call(socket, state))
}

async fn relay_call(socket: WebSocket, state: AppState) {
    tracing::info!("telephony client connected");

    let engine = match connect_engine(&state.config.engine.url, &state.config.engine.api_key).await
    {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "engine connection failed, dropping call");
            return;
        }
    };

    let validator = match GuardrailValidator::new(&state.guardrail_rules()) {
        Ok(validator) => validator,
        Err(e) => {
            tracing::error!(error = %e, "guardrail configuration invalid, dropping call");
            return;
        }
    };

    let (slots, calendar_errored) = match &state.slots {
        Some(provider) => slots_or_empty(provider.as_ref(), Utc::now().date_naive()).await,
        None => (Vec::new(), false),
    };

    let (engine_sink, engine_stream) = engine.split();
    let (telephony_sink, telephony_stream) = socket.split();

    let coordinator = RelayCoordinator::new(
        state.registry.clone(),
        validator,
        RelayConfig {
            voice: state.config.engine.voice.clone(),
            temperature: state.config.engine.temperature,
        },
        slots,
        calendar_errored as u32,
    );

    let summary = coordinator
        .run(
            AxumTelephonyStream {
                inner: telephony_stream,
            },
            AxumTelephonySink {
                inner: telephony_sink,
            },
            WsEngineStream {
                inner: engine_stream,
            },
            WsEngineSink { inner: engine_sink },
        )
        .await;

    match summary {
        Some(summary) => finalize_call(&state, &summary).await,
        None => tracing::info!("call ended before stream start; no summary to record"),
    }
}

/// Hand the finished call to the metrics and storage collaborators.
///
/// Failures here are logged, never propagated: the call is already over.
async fn finalize_call(state: &AppState, summary: &CallSummary) {
    let metrics = report::compute_call_metrics(summary);
    let report_path =
        match report::write_report(&state.config.storage.reports_dir, &summary.call_id, &metrics) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, call_id = %summary.call_id, "failed to write call report");
                None
            }
        };

    let record = storage::SummaryRecord::from_summary(
        summary,
        report_path.as_ref().and_then(|p| p.to_str()),
    );
    if let Err(e) = state.store.save(&record) {
        tracing::warn!(error = %e, call_id = %summary.call_id, "failed to persist call summary");
    }
}
