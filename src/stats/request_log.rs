//! Request logging formatter

use crate::api::{Message, RelayRequest, Role};

/// Format a request log message in compact format
pub fn format_request_log(request: &RelayRequest, candidates: &[String]) -> String {
    let model = candidates.first().map(String::as_str).unwrap_or("unknown");

    let mut parts = vec![format!("model={}", model), format!("msgs={}", request.messages.len())];

    if candidates.len() > 1 {
        parts.push(format!("fallbacks={}", candidates.len() - 1));
    }

    if let Some(temperature) = request.temperature {
        parts.push(format!("temp={}", temperature));
    }

    let placeholders = request.messages.iter().filter(|m| m.is_placeholder()).count();
    if placeholders > 0 {
        parts.push(format!("placeholders={}", placeholders));
    }

    if let Some(msg) = extract_last_user_message(&request.messages) {
        parts.push(format!("\"{}\"", msg));
    }

    format!("→ {}", parts.join(" "))
}

/// Extract and format the latest user message with truncation
fn extract_last_user_message(messages: &[Message]) -> Option<String> {
    let msg = messages.iter().rev().find(|m| m.role == Role::User)?;
    let normalized = normalize_whitespace(&msg.content);
    if normalized.is_empty() {
        return None;
    }
    Some(truncate_message(&normalized))
}

/// Convert newlines and tabs to single spaces, collapse multiple spaces
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate message according to rules:
/// - If <= 100 chars: show all
/// - If > 100 chars: first 25 + " ... " + last 75
fn truncate_message(s: &str) -> String {
    const MAX_TOTAL: usize = 100;
    const PREFIX_LEN: usize = 25;
    const SUFFIX_LEN: usize = 75;
    const ELLIPSIS: &str = " ... ";

    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= MAX_TOTAL {
        return s.to_string();
    }

    let prefix: String = chars[..PREFIX_LEN].iter().collect();
    let suffix: String = chars[chars.len() - SUFFIX_LEN..].iter().collect();

    format!("{}{}{}", prefix, ELLIPSIS, suffix)
}
