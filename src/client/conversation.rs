//! In-memory conversation state for the chat client

use crate::api::{Message, Role};

/// Ordered messages of one chat session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a system prompt
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Append the empty assistant message a streamed reply fills in
    pub fn push_placeholder(&mut self) {
        self.messages.push(Message::placeholder());
    }

    pub fn push_error(&mut self, detail: impl Into<String>) {
        self.messages.push(Message::error(detail));
    }

    /// Accumulator over the trailing assistant message, appending a
    /// placeholder first if the conversation does not end with one
    pub fn reply(&mut self) -> AssistantAccumulator<'_> {
        let needs_placeholder = !matches!(
            self.messages.last(),
            Some(m) if m.role == Role::Assistant && !m.is_error
        );
        if needs_placeholder {
            self.push_placeholder();
        }

        let len = self.messages.len();
        AssistantAccumulator {
            message: &mut self.messages[len - 1],
        }
    }

    /// Messages to submit: placeholders and local error notices removed
    pub fn submittable(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| !m.is_error && !m.is_placeholder())
            .cloned()
            .collect()
    }

    /// Drop everything except a leading system prompt
    pub fn reset(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
        self.messages.truncate(1);
    }
}

/// Appends streamed fragments to the trailing assistant message
#[derive(Debug)]
pub struct AssistantAccumulator<'a> {
    message: &'a mut Message,
}

impl AssistantAccumulator<'_> {
    /// Append a fragment and return the content so far
    pub fn append(&mut self, fragment: &str) -> &str {
        self.message.content.push_str(fragment);
        &self.message.content
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }

    pub fn is_empty(&self) -> bool {
        self.message.content.is_empty()
    }
}
