//! Incremental rendering of a streamed reply
//!
//! A [`ChatSession`] keeps at most one reply in flight. Starting a new turn
//! stops the previous one. The read loop waits on the next body chunk and the
//! stop signal together, so a stop takes effect at the next read.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::conversation::{AssistantAccumulator, Conversation};
use super::error::RenderError;
use super::relay::RelayClient;
use crate::stream::{EventParser, StreamEvent};
use crate::upstream::ByteStream;

/// Receives live updates of the reply being rendered
pub trait RenderSink {
    /// A fragment arrived; `content` is the whole reply so far
    fn fragment(&mut self, fragment: &str, content: &str);

    /// An error notice was appended to the conversation
    fn error(&mut self, _message: &str) {}
}

/// Stops the reply it was handed out for
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    pub fn stop(&self) {
        self.0.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    /// Stopped by the user; partial output is kept
    Cancelled,
    /// An error notice with this text was appended
    Failed(String),
}

/// Why the read loop returned normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// `[DONE]` was seen
    Done,
    /// The body ended without `[DONE]`
    Eof,
}

/// Read `body` to the end, appending each fragment to `reply`.
///
/// `body` is owned and dropped on every return path, which releases the
/// underlying connection.
pub async fn pump_events<S>(
    mut body: ByteStream,
    reply: &mut AssistantAccumulator<'_>,
    cancel: &CancellationToken,
    sink: &mut S,
) -> Result<StreamEnd, RenderError>
where
    S: RenderSink + ?Sized,
{
    let mut parser = EventParser::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RenderError::Cancelled),
            next = body.next() => next,
        };

        let events = match next {
            Some(Ok(chunk)) => parser.feed(&chunk),
            Some(Err(e)) => return Err(RenderError::Stream(e)),
            None => {
                let events = parser.finish();
                return Ok(apply_events(events, reply, sink).unwrap_or(StreamEnd::Eof));
            }
        };

        if let Some(end) = apply_events(events, reply, sink) {
            return Ok(end);
        }
    }
}

fn apply_events<S>(
    events: Vec<StreamEvent>,
    reply: &mut AssistantAccumulator<'_>,
    sink: &mut S,
) -> Option<StreamEnd>
where
    S: RenderSink + ?Sized,
{
    for event in events {
        match event {
            StreamEvent::Fragment(fragment) => {
                let content = reply.append(&fragment);
                sink.fragment(&fragment, content);
            }
            StreamEvent::Done => return Some(StreamEnd::Done),
        }
    }
    None
}

/// A conversation bound to a relay, with one reply in flight at a time
pub struct ChatSession {
    client: RelayClient,
    conversation: Conversation,
    in_flight: Option<CancellationToken>,
    last_model: Option<String>,
}

impl ChatSession {
    pub fn new(client: RelayClient) -> Self {
        Self::with_conversation(client, Conversation::new())
    }

    pub fn with_conversation(client: RelayClient, conversation: Conversation) -> Self {
        Self {
            client,
            conversation,
            in_flight: None,
            last_model: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// True while a reply is being requested or streamed
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Model reported by the relay for the latest reply
    pub fn last_model(&self) -> Option<&str> {
        self.last_model.as_deref()
    }

    /// Stop the reply in flight, if any
    pub fn stop(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    pub fn reset(&mut self) {
        self.stop();
        self.conversation.reset();
        self.last_model = None;
    }

    /// Queue a user turn and its placeholder reply. Stops any reply still in
    /// flight. Call [`ChatSession::run`] to stream the reply.
    pub fn begin(&mut self, text: impl Into<String>) -> StopHandle {
        self.stop();

        self.conversation.push_user(text);
        self.conversation.push_placeholder();

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        StopHandle(token)
    }

    /// Stream the reply for the turn queued by [`ChatSession::begin`]
    pub async fn run<S>(&mut self, sink: &mut S) -> RenderOutcome
    where
        S: RenderSink + ?Sized,
    {
        let Some(cancel) = self.in_flight.clone() else {
            tracing::debug!("No turn queued");
            return RenderOutcome::Completed;
        };

        let result = stream_reply(
            &self.client,
            &mut self.conversation,
            &mut self.last_model,
            &cancel,
            sink,
        )
        .await;
        self.in_flight = None;

        match result {
            Ok(end) => {
                tracing::debug!(?end, model = ?self.last_model, "Reply finished");
                RenderOutcome::Completed
            }
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Reply stopped by user");
                RenderOutcome::Cancelled
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reply failed");
                let message = e.to_string();
                self.conversation.push_error(&message);
                sink.error(&message);
                RenderOutcome::Failed(message)
            }
        }
    }

    /// Queue `text` and stream its reply
    pub async fn send<S>(&mut self, text: impl Into<String>, sink: &mut S) -> RenderOutcome
    where
        S: RenderSink + ?Sized,
    {
        self.begin(text);
        self.run(sink).await
    }
}

async fn stream_reply<S>(
    client: &RelayClient,
    conversation: &mut Conversation,
    model_used: &mut Option<String>,
    cancel: &CancellationToken,
    sink: &mut S,
) -> Result<StreamEnd, RenderError>
where
    S: RenderSink + ?Sized,
{
    let messages = conversation.submittable();

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RenderError::Cancelled),
        opened = client.open(messages) => opened?,
    };
    *model_used = opened.model;

    let mut reply = conversation.reply();
    pump_events(opened.body, &mut reply, cancel, sink).await
}
