//! Mock upstream server that simulates the hosted chat completion API
//!
//! Tests pre-configure responses via SharedBackendState before each request.
//! Event-stream bodies are written chunk by chunk so the relay sees them
//! arrive in pieces, the way a real upstream sends them.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::types::{BackendState, MockResponse, ReceivedRequest, SharedBackendState};

/// Pause between streamed chunks
const CHUNK_DELAY: Duration = Duration::from_millis(5);

/// Default fallback response when no response is queued
fn default_completion_response() -> MockResponse {
    MockResponse::sse([
        "data: {\"id\":\"default\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Default response (no mock queued)\"}}]}\n\n",
        "data: [DONE]\n\n",
    ])
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

/// Handle POST /v1/chat/completions - serves pre-configured mock responses
async fn handle_chat_completions(
    State(state): State<SharedBackendState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body_json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    let received = ReceivedRequest {
        path: "/v1/chat/completions".to_string(),
        authorization: header_value(&headers, header::AUTHORIZATION),
        accept: header_value(&headers, header::ACCEPT),
        body: body_json,
    };

    // Pop the next configured response (or use default)
    let mock_response = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(received);
        state.completions_served += 1;
        state.response_queue.pop_front().unwrap_or_else(default_completion_response)
    };

    let status = StatusCode::from_u16(mock_response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let chunks = mock_response.chunks;
    let stream = futures::stream::unfold(chunks.into_iter(), |mut rest| async move {
        let chunk = rest.next()?;
        tokio::time::sleep(CHUNK_DELAY).await;
        Some((Ok::<Bytes, std::io::Error>(Bytes::from(chunk)), rest))
    });

    (
        status,
        [(header::CONTENT_TYPE, mock_response.content_type)],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Handle GET /health
async fn handle_health() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}

/// Start the mock upstream server and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedBackendState> {
    let state: SharedBackendState = std::sync::Arc::new(std::sync::Mutex::new(BackendState::default()));

    let app = Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/health", get(handle_health))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock upstream to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock upstream server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(state)
}

/// Helper to configure the next response for /v1/chat/completions
pub fn queue_response(state: &SharedBackendState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// Helper to get all requests received since last clear
pub fn drain_requests(state: &SharedBackendState) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    s.received_requests.drain(..).collect()
}
