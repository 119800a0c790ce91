//! Upstream transport trait

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::api::UpstreamRequest;

/// Response body as a stream of byte chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Status and still-unread body of an upstream response
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: ByteStream,
}

impl UpstreamReply {
    /// Read the whole body as text, used for error responses only
    pub async fn into_text(self) -> String {
        let mut body = self.body;
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read upstream error body");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl std::fmt::Debug for UpstreamReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamReply").field("status", &self.status).finish_non_exhaustive()
    }
}

/// The request never produced a response
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends one completion request to the upstream API
#[async_trait]
pub trait CompletionUpstream: Send + Sync {
    async fn send(&self, request: &UpstreamRequest<'_>) -> Result<UpstreamReply, TransportError>;

    /// Endpoint description (for logging)
    fn endpoint(&self) -> &str;
}
