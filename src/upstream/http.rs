//! reqwest-backed upstream

use async_trait::async_trait;
use axum::http::header;
use futures::StreamExt;

use super::transport::{CompletionUpstream, TransportError, UpstreamReply};
use crate::api::UpstreamRequest;

/// Completion endpoint reached over HTTP with a bearer credential
pub struct HttpUpstream {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpUpstream {
    pub fn new(http_client: reqwest::Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CompletionUpstream for HttpUpstream {
    async fn send(&self, request: &UpstreamRequest<'_>) -> Result<UpstreamReply, TransportError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError(format!("Failed to connect to upstream {}: {}", self.endpoint, e)))?;

        let status = response.status();
        tracing::debug!(
            status = %status,
            model = request.model,
            headers = ?response.headers(),
            "Received response from upstream"
        );

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed();

        Ok(UpstreamReply { status, body })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
