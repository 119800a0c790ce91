//! Upstream completion API access

mod client;
mod http;
#[cfg(test)]
pub(crate) mod scripted;
mod transport;

pub use client::{build_http_client, select_ca_bundle, CA_BUNDLE_SEARCH_PATHS};
pub use http::HttpUpstream;
pub use transport::{ByteStream, CompletionUpstream, TransportError, UpstreamReply};

use std::sync::Arc;

use crate::config::UpstreamConfig;

/// Build the HTTP upstream, or `None` when no credential is configured
pub fn build_upstream(
    config: &UpstreamConfig,
) -> Result<Option<Arc<dyn CompletionUpstream>>, Box<dyn std::error::Error>> {
    let Some(api_key) = config.credential() else {
        return Ok(None);
    };
    let http_client = build_http_client(config)?;
    Ok(Some(Arc::new(HttpUpstream::new(
        http_client,
        config.chat_completions_url(),
        api_key,
    ))))
}
