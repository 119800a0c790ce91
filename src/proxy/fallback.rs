//! Model fallback loop
//!
//! Candidates are tried in order. A capacity error retries the same model
//! after an exponential backoff with jitter until its attempt budget is
//! spent, then moves on. Any other failure ends the loop immediately.

use axum::http::StatusCode;
use rand::Rng;
use regex::Regex;
use std::time::Duration;

use super::error::RelayError;
use crate::api::{Message, UpstreamRequest};
use crate::config::RetryConfig;
use crate::upstream::{ByteStream, CompletionUpstream};

/// Retry budget, backoff and capacity detection
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub preferred_retries: u32,
    pub fallback_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    capacity_pattern: Regex,
}

impl FallbackPolicy {
    pub fn from_config(retry: &RetryConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            preferred_retries: retry.preferred_retries,
            fallback_retries: retry.fallback_retries,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            capacity_pattern: Regex::new(&retry.capacity_pattern)?,
        })
    }

    /// Total attempts allowed for the candidate at `index`
    pub fn attempts_for(&self, index: usize) -> u32 {
        let retries = if index == 0 {
            self.preferred_retries
        } else {
            self.fallback_retries
        };
        1 + retries
    }

    /// Delay before retry number `attempt + 1` of the same model
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let half_ms = (exp.as_millis() / 2) as u64;
        let jitter = Duration::from_millis(rand::rng().random_range(0..=half_ms));
        (exp + jitter).min(self.max_delay)
    }

    /// 429, or an error body mentioning capacity.
    ///
    /// The body match depends on upstream wording and is only a heuristic.
    pub fn is_capacity_error(&self, status: StatusCode, body: &str) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || self.capacity_pattern.is_match(body)
    }
}

/// A successful upstream stream and the model that produced it
pub struct Forwarded {
    pub model: String,
    pub attempts: u32,
    pub body: ByteStream,
}

/// Try each candidate until one streams, a non-capacity error occurs, or all
/// candidates are exhausted.
pub async fn forward_with_fallback(
    upstream: &dyn CompletionUpstream,
    policy: &FallbackPolicy,
    candidates: &[String],
    messages: &[Message],
    temperature: f32,
) -> Result<Forwarded, RelayError> {
    let mut attempts = 0;

    for (index, model) in candidates.iter().enumerate() {
        let max_attempts = policy.attempts_for(index);

        for attempt in 0..max_attempts {
            attempts += 1;
            let request = UpstreamRequest::streaming(model, messages, temperature);

            tracing::debug!(
                model = %model,
                candidate = index,
                attempt = attempt + 1,
                max_attempts,
                endpoint = upstream.endpoint(),
                "Sending upstream request"
            );

            let reply = upstream.send(&request).await?;
            let status = reply.status;

            if status.is_success() {
                if index > 0 || attempt > 0 {
                    tracing::info!(model = %model, attempts, "Upstream accepted request after fallback");
                }
                return Ok(Forwarded {
                    model: model.clone(),
                    attempts,
                    body: reply.body,
                });
            }

            let body = reply.into_text().await;
            if !policy.is_capacity_error(status, &body) {
                tracing::error!(
                    status = %status,
                    model = %model,
                    error_body = %body,
                    "Upstream returned error response"
                );
                return Err(RelayError::Upstream { status, body });
            }

            if attempt + 1 < max_attempts {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    model = %model,
                    status = %status,
                    delay_ms = delay.as_millis() as u64,
                    "Model at capacity, retrying"
                );
                tokio::time::sleep(delay).await;
            } else {
                tracing::warn!(model = %model, status = %status, "Model at capacity, moving to next candidate");
            }
        }
    }

    tracing::error!(candidates = ?candidates, attempts, "All candidate models at capacity");
    Err(RelayError::CapacityExhausted {
        candidates: candidates.to_vec(),
    })
}
