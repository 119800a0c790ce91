//! Shared types for the e2e test framework

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock response the upstream will serve for the next request to /v1/chat/completions
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    /// Body chunks, written to the wire one at a time
    pub chunks: Vec<String>,
    pub content_type: String,
}

impl MockResponse {
    /// A 200 event stream delivered as the given chunks
    pub fn sse<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: 200,
            chunks: chunks.into_iter().map(Into::into).collect(),
            content_type: "text/event-stream".to_string(),
        }
    }

    /// Create an error response
    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            chunks: vec![body.into()],
            content_type: "application/json".to_string(),
        }
    }

    /// The 429 the hosted API sends when a model has no capacity
    pub fn capacity_exceeded() -> Self {
        Self::error(
            429,
            r#"{"object":"error","message":"Service tier capacity exceeded for this model.","type":"service_tier_capacity_exceeded","param":null,"code":"3505"}"#,
        )
    }

    pub fn body(&self) -> String {
        self.chunks.concat()
    }
}

/// Shared state for the mock upstream server
#[derive(Debug, Default)]
pub struct BackendState {
    /// Queue of responses to serve - tests push responses, upstream pops and serves them
    pub response_queue: VecDeque<MockResponse>,
    /// All requests received by the upstream (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
    /// Completion requests served since the last reset; draining does not touch it
    pub completions_served: usize,
}

impl BackendState {
    /// Forget queued responses and recorded requests
    pub fn reset(&mut self) {
        self.response_queue.clear();
        self.received_requests.clear();
        self.completions_served = 0;
    }
}

/// A request received by the mock upstream
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ReceivedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: serde_json::Value,
}

impl ReceivedRequest {
    pub fn model(&self) -> &str {
        self.body.get("model").and_then(|v| v.as_str()).unwrap_or("")
    }
}

pub type SharedBackendState = Arc<Mutex<BackendState>>;

/// A parsed SSE event from the relay response
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub data: String,
    pub is_done: bool,
}

impl SseEvent {
    pub fn parse_json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_str(&self.data).map_err(|e| anyhow::anyhow!("SSE JSON parse error: {}: {}", e, self.data))
    }
}

/// Raw relay response: status, headers of interest and the full body
#[derive(Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub content_type: String,
    pub model_used: Option<String>,
    pub body: String,
}

/// Result of a streaming relay request - all parsed SSE events
#[derive(Debug)]
pub struct StreamingResponse {
    pub model_used: Option<String>,
    pub raw: String,
    pub events: Vec<SseEvent>,
}

impl StreamingResponse {
    /// Check that the stream ends with [DONE]
    pub fn has_done_marker(&self) -> bool {
        self.events.last().map(|e| e.is_done).unwrap_or(false)
    }

    /// Get all data events (excluding [DONE])
    pub fn data_events(&self) -> Vec<&SseEvent> {
        self.events.iter().filter(|e| !e.is_done).collect()
    }

    /// Accumulate all text content deltas
    pub fn accumulated_content(&self) -> String {
        let mut result = String::new();
        for event in self.data_events() {
            if let Ok(json) = event.parse_json() {
                if let Some(content) = json
                    .pointer("/choices/0/delta/content")
                    .and_then(|v| v.as_str())
                {
                    result.push_str(content);
                }
            }
        }
        result
    }
}

/// Outcome of a single test case
#[derive(Debug)]
pub struct TestResult {
    pub name: &'static str,
    /// Name prefix before `/`: basic, fallback, passthrough
    pub category: &'static str,
    pub error: Option<String>,
    pub duration_ms: u64,
    /// How many completion requests the mock upstream answered during the test
    pub upstream_attempts: usize,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}
