//! Chat request handler for the relay

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::error::RelayError;
use super::fallback::forward_with_fallback;
use super::server::ProxyState;
use super::streaming::tap_stream;
use crate::api::{strip_placeholders, RelayRequest};
use crate::stats::{format_request_log, StreamSummary};

/// Response header naming the model that produced the stream
pub const MODEL_USED_HEADER: HeaderName = HeaderName::from_static("x-model-used");

/// POST /api/chat
pub async fn chat_handler(State(state): State<ProxyState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    match relay_chat(&state, &body, request_id).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(request_id = %request_id, status = %e.status(), error = %e, "Chat request failed");
            e.into_response()
        }
    }
}

async fn relay_chat(state: &ProxyState, body: &[u8], request_id: Uuid) -> Result<Response, RelayError> {
    let Some(upstream) = state.upstream.as_ref() else {
        return Err(RelayError::MissingCredential);
    };

    let request: RelayRequest =
        serde_json::from_slice(body).map_err(|e| RelayError::BadRequest(e.to_string()))?;

    if let Some(model) = request.model.as_deref() {
        if HeaderValue::from_str(model).is_err() {
            return Err(RelayError::BadRequest(format!("invalid model identifier: {:?}", model)));
        }
    }

    let candidates = state.config.models.candidates(request.model.as_deref());
    tracing::info!(request_id = %request_id, "{}", format_request_log(&request, &candidates));

    let temperature = request
        .temperature
        .unwrap_or(state.config.models.default_temperature);
    let messages = strip_placeholders(request.messages);
    if messages.is_empty() {
        return Err(RelayError::BadRequest("conversation has no messages to send".to_string()));
    }

    let forwarded =
        forward_with_fallback(&**upstream, &state.policy, &candidates, &messages, temperature).await?;

    tracing::debug!(
        request_id = %request_id,
        model = %forwarded.model,
        attempts = forwarded.attempts,
        "Streaming upstream response to client"
    );

    let model_header = HeaderValue::from_str(&forwarded.model)
        .map_err(|e| RelayError::BadRequest(format!("invalid model identifier: {}", e)))?;
    let summary = StreamSummary::new(&forwarded.model, forwarded.attempts);
    let body = Body::from_stream(tap_stream(forwarded.body, summary, request_id));

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(MODEL_USED_HEADER, model_header);

    Ok(response)
}
