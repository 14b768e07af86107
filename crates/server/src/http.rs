//! HTTP handlers
//!
//! Call placement and the telephony webhook that connects an answered call
//! to the media stream.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// Liveness probe.
pub async fn index() -> Json<Value> {
    Json(json!({"message": "Callbridge media stream server is running"}))
}

/// Request body for outbound call placement.
#[derive(Debug, Deserialize)]
pub struct CallRequest {
    /// Destination phone number.
    pub to: String,
}

/// Place an outbound call via the telephony provider's REST API.
///
/// The provider answers the call and fetches `/outgoing-call` for routing.
pub async fn place_call(
    State(state): State<AppState>,
    Json(request): Json<CallRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if request.to.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "phone number is required"})),
        ));
    }

    let telephony = &state.config.telephony;
    let url = format!(
        "{}/Accounts/{}/Calls.json",
        telephony.api_base, telephony.account_sid
    );
    let webhook = format!("{}/outgoing-call", telephony.public_url);
    let params = [
        ("To", request.to.as_str()),
        ("From", telephony.phone_number.as_str()),
        ("Url", webhook.as_str()),
    ];

    let response = state
        .http
        .post(&url)
        .basic_auth(&telephony.account_sid, Some(&telephony.auth_token))
        .form(&params)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            tracing::error!(error = %e, to = %request.to, "call placement failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "call placement failed"})),
            )
        })?;

    let payload: Value = response.json().await.map_err(|e| {
        tracing::error!(error = %e, "telephony API returned malformed response");
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": "malformed provider response"})),
        )
    })?;
    let call_sid = payload
        .get("sid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    tracing::info!(call_id = %call_sid, to = %request.to, "call initiated");
    Ok(Json(json!({"call_sid": call_sid})))
}

/// Webhook answered-call handler: TwiML that announces the call and connects
/// the media stream back to this server.
pub async fn outgoing_call(headers: HeaderMap) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");

    let twiml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<Response>",
            "<Say>This call may be recorded for compliance purposes</Say>",
            r#"<Pause length="1"/>"#,
            "<Say>Connecting you with the scheduling assistant</Say>",
            "<Connect>",
            r#"<Stream url="wss://{host}/media-stream"/>"#,
            "</Connect>",
            "</Response>"
        ),
        host = host
    );

    ([(header::CONTENT_TYPE, "application/xml")], twiml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_twiml_embeds_request_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "relay.example.com".parse().unwrap());

        let response = outgoing_call(headers).await.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"<Stream url="wss://relay.example.com/media-stream"/>"#));
        assert!(body.starts_with("<?xml"));
    }
}
