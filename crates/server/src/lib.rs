//! Callbridge server
//!
//! HTTP/WS surface wiring the duplex relay to real sockets: call placement,
//! the TwiML connect document, the media-stream WebSocket endpoint, and
//! per-call finalization (report + summary row).

pub mod http;
pub mod links;
pub mod report;
pub mod state;
pub mod storage;
pub mod websocket;

pub use state::AppState;

use axum::routing::{any, get, post};
use axum::Router;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] callbridge_config::ConfigError),

    #[error("storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("call placement failed: {0}")]
    Telephony(String),
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::index))
        .route("/call", post(http::place_call))
        .route("/outgoing-call", any(http::outgoing_call))
        .route("/media-stream", get(websocket::media_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
