//! In-memory upstream that replays queued replies (tests only)

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use futures::StreamExt;

use super::transport::{CompletionUpstream, TransportError, UpstreamReply};
use crate::api::UpstreamRequest;

enum Scripted {
    Reply { status: StatusCode, chunks: Vec<Bytes> },
    TransportFailure(String),
}

/// Serves queued replies in order and records every request it receives
#[derive(Default)]
pub struct ScriptedUpstream {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 event stream delivered as the given chunks
    pub fn push_stream(&self, chunks: &[&str]) {
        self.replies.lock().unwrap().push_back(Scripted::Reply {
            status: StatusCode::OK,
            chunks: chunks.iter().map(|c| Bytes::copy_from_slice(c.as_bytes())).collect(),
        });
    }

    /// Queue an error status with a body
    pub fn push_error(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Scripted::Reply {
            status: StatusCode::from_u16(status).unwrap(),
            chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
        });
    }

    pub fn push_capacity_error(&self) {
        self.push_error(429, r#"{"object":"error","message":"Service tier capacity exceeded for this model.","type":"service_tier_capacity_exceeded","code":"3505"}"#);
    }

    pub fn push_transport_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted::TransportFailure(message.to_string()));
    }

    /// Bodies of every request received so far
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Model of every request received so far
    pub fn models(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["model"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl CompletionUpstream for ScriptedUpstream {
    async fn send(&self, request: &UpstreamRequest<'_>) -> Result<UpstreamReply, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request).unwrap());

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply { status, chunks }) => Ok(UpstreamReply {
                status,
                body: futures::stream::iter(chunks.into_iter().map(Ok::<Bytes, std::io::Error>)).boxed(),
            }),
            Some(Scripted::TransportFailure(message)) => Err(TransportError(message)),
            None => Err(TransportError("no scripted reply left".to_string())),
        }
    }

    fn endpoint(&self) -> &str {
        "scripted://upstream"
    }
}
