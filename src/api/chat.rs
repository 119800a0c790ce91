//! Chat API type definitions shared by the relay and the client

use serde::{Deserialize, Deserializer, Serialize};

/// Temperature used when the caller does not send one
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Pending tool invocations, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<serde_json::Value>>,
    /// Local error notice, never sent anywhere
    #[serde(skip)]
    pub is_error: bool,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Empty assistant message standing in for a reply that is still streaming
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }

    /// Assistant-side error notice shown to the user
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(format!("Error: {}", detail.into()))
        }
    }

    fn has_pending_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    /// True for an assistant message with blank content and no tool calls.
    ///
    /// The upstream API rejects empty-content messages, so these never leave
    /// the process.
    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant
            && self.content.trim().is_empty()
            && !self.has_pending_tool_calls()
    }
}

/// Remove placeholder assistant messages before submission
pub fn strip_placeholders(messages: Vec<Message>) -> Vec<Message> {
    messages.into_iter().filter(|m| !m.is_placeholder()).collect()
}

/// Request accepted by the relay
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayRequest {
    pub messages: Vec<Message>,
    /// Preferred model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Request sent to the upstream completion API
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub temperature: f32,
    pub stream: bool,
    pub safe_prompt: bool,
}

impl<'a> UpstreamRequest<'a> {
    /// Streaming request with the safety prompt enabled
    pub fn streaming(model: &'a str, messages: &'a [Message], temperature: f32) -> Self {
        Self {
            model,
            messages,
            temperature,
            stream: true,
            safe_prompt: true,
        }
    }
}
