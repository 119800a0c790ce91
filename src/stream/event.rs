//! Event line parsing

/// Marker every payload-carrying line starts with
pub const DATA_PREFIX: &str = "data:";

/// Payload that terminates a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A meaningful event decoded from one stream line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text to append to the reply
    Fragment(String),
    /// Terminal sentinel
    Done,
}

/// Parse one complete line.
///
/// Returns `None` for lines without the marker, empty payloads, malformed
/// JSON and chunks that carry no text.
pub fn parse_event_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    let fragment = extract_fragment(payload)?;
    if fragment.is_empty() {
        return None;
    }
    Some(StreamEvent::Fragment(fragment))
}

/// Pull `choices[0].delta.content` out of a JSON payload.
///
/// Malformed JSON yields `None`; a well-formed chunk without the path yields
/// an empty fragment.
pub fn extract_fragment(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let fragment = value
        .pointer("/choices/0/delta/content")
        .and_then(|c| c.as_str())
        .unwrap_or_default();
    Some(fragment.to_string())
}
