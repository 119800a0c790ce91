//! HTTP client that talks to the relay the way the chat client does

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;

use crate::types::{RelayResponse, SseEvent, StreamingResponse};

/// Build an HTTP client
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build reqwest client")
}

/// POST a conversation to the relay and read the whole response
pub async fn send_chat(
    client: &Client,
    relay_addr: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<RelayResponse> {
    let url = format!("http://{relay_addr}/api/chat");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send request to relay: {}", e))?;

    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let model_used = resp
        .headers()
        .get("x-model-used")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    // Collect all bytes from the stream
    let mut stream = resp.bytes_stream();
    let mut all_bytes: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        all_bytes.extend_from_slice(&chunk);
    }

    Ok(RelayResponse {
        status,
        content_type,
        model_used,
        body: String::from_utf8_lossy(&all_bytes).into_owned(),
    })
}

/// POST a conversation and parse the successful event stream
pub async fn send_streaming(
    client: &Client,
    relay_addr: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<StreamingResponse> {
    let resp = send_chat(client, relay_addr, request_body).await?;

    if resp.status != 200 {
        return Err(anyhow::anyhow!("Relay returned error {}: {}", resp.status, resp.body));
    }

    if !resp.content_type.contains("text/event-stream") {
        return Err(anyhow::anyhow!("Expected text/event-stream but got: {}", resp.content_type));
    }

    let events = parse_sse(&resp.body)?;

    Ok(StreamingResponse {
        model_used: resp.model_used,
        raw: resp.body,
        events,
    })
}

/// Parse SSE body text into events
///
/// SSE format: Each event is separated by \n\n
/// Each event line: "data: <content>" or "event: <type>" etc.
/// We only care about "data: " lines.
fn parse_sse(text: &str) -> anyhow::Result<Vec<SseEvent>> {
    let mut events = Vec::new();

    // Split on double newlines to get individual events
    for raw_event in text.split("\n\n") {
        let raw_event = raw_event.trim();
        if raw_event.is_empty() {
            continue;
        }

        let mut data_line: Option<&str> = None;
        for line in raw_event.lines() {
            if let Some(stripped) = line.strip_prefix("data: ") {
                data_line = Some(stripped);
            }
        }

        let data = match data_line {
            Some(d) => d,
            None => continue, // No data line in this event block (e.g. comment-only)
        };

        events.push(SseEvent {
            data: data.to_string(),
            is_done: data == "[DONE]",
        });
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_basic() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\ndata: [DONE]\n\n";
        let events = parse_sse(sse).unwrap();
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_done);
        assert!(events[1].is_done);
    }

    #[test]
    fn test_parse_sse_skips_comments() {
        let sse = ": keep-alive\n\ndata: {\"a\":1}\n\ndata: [DONE]\n\n";
        let events = parse_sse(sse).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, r#"{"a":1}"#);
        assert!(events[1].is_done);
    }
}
