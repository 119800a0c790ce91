//! HTTP access to the relay's chat endpoint

use futures::StreamExt;
use reqwest::header::ACCEPT;
use std::time::Duration;

use super::error::RenderError;
use crate::api::{Message, RelayRequest};
use crate::upstream::ByteStream;

/// An open reply stream and the model the relay picked
pub struct RelayStream {
    pub model: Option<String>,
    pub body: ByteStream,
}

/// Client for `POST /api/chat`
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    chat_url: String,
    model: Option<String>,
    temperature: Option<f32>,
}

impl RelayClient {
    pub fn new(relay_url: &str) -> Result<Self, RenderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            chat_url: format!("{}/api/chat", relay_url.trim_end_matches('/')),
            model: None,
            temperature: None,
        })
    }

    /// Ask the relay to prefer this model
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Submit `messages` and return the reply stream.
    ///
    /// A non-success status is read in full and returned as
    /// [`RenderError::Relay`].
    pub async fn open(&self, messages: Vec<Message>) -> Result<RelayStream, RenderError> {
        let request = RelayRequest {
            messages,
            model: self.model.clone(),
            temperature: self.temperature,
        };

        tracing::debug!(url = %self.chat_url, messages = request.messages.len(), "Opening reply stream");

        let response = self
            .http
            .post(&self.chat_url)
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(RenderError::Relay {
                status: status.as_u16(),
                body,
            });
        }

        let model = response
            .headers()
            .get("x-model-used")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed();

        Ok(RelayStream { model, body })
    }
}
