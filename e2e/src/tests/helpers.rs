//! Common test helpers and JSON builders

use serde_json::{json, Value};

// ─── Request builders ────────────────────────────────────────────────────────

/// A single user turn
pub fn basic_request(prompt: &str) -> Value {
    json!({
        "messages": [{"role": "user", "content": prompt}]
    })
}

/// A user turn followed by the empty assistant placeholder the client keeps
/// while a reply streams
pub fn request_with_placeholder(prompt: &str) -> Value {
    json!({
        "messages": [
            {"role": "user", "content": prompt},
            {"role": "assistant", "content": ""}
        ]
    })
}

// ─── Response builders ────────────────────────────────────────────────────────

/// One `data:` event carrying a content delta
pub fn delta_event(content: &str) -> String {
    let chunk = json!({
        "id": "cmpl-e2e",
        "object": "chat.completion.chunk",
        "created": 1700000000,
        "model": "mistral-large-latest",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    });
    format!("data: {}\n\n", chunk)
}

/// A complete upstream event stream for the given fragments
pub fn upstream_stream(fragments: &[&str]) -> Vec<String> {
    let mut events: Vec<String> = fragments.iter().map(|f| delta_event(f)).collect();
    events.push("data: [DONE]\n\n".to_string());
    events
}

// ─── Assertion helpers ────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}
