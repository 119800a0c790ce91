//! Relay error taxonomy and its HTTP mapping

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::upstream::TransportError;

/// Failures the relay reports to its caller
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Upstream API key is not configured (set MISTRAL_API_KEY or upstream.api_key)")]
    MissingCredential,

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    /// Non-capacity upstream error, reported verbatim
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("Upstream transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("All candidate models are at capacity (tried: {})", .candidates.join(", "))]
    CapacityExhausted { candidates: Vec<String> },
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            RelayError::Transport(_) => StatusCode::BAD_GATEWAY,
            RelayError::CapacityExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            RelayError::Upstream { body, .. } => body,
            other => other.to_string(),
        };
        (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
    }
}
