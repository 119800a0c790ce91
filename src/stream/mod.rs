//! Incremental event-stream parsing
//!
//! One implementation of line reassembly and fragment extraction, used by the
//! relay (to observe what it forwards) and by the client (to render it).

mod event;
mod line_buffer;

pub use event::{extract_fragment, parse_event_line, StreamEvent, DATA_PREFIX, DONE_SENTINEL};
pub use line_buffer::LineBuffer;

/// Turns raw body chunks into stream events
#[derive(Debug, Default)]
pub struct EventParser {
    lines: LineBuffer,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the events from every line it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| parse_event_line(line))
            .collect()
    }

    /// Flush an unterminated trailing line at end of stream
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.lines
            .finish()
            .and_then(|line| parse_event_line(&line))
            .into_iter()
            .collect()
    }
}

/// Parse a complete stream body into its ordered text fragments
pub fn parse_fragments(text: &str) -> Vec<String> {
    let mut parser = EventParser::new();
    let mut events = parser.feed(text.as_bytes());
    events.extend(parser.finish());

    events
        .into_iter()
        .filter_map(|event| match event {
            StreamEvent::Fragment(fragment) => Some(fragment),
            StreamEvent::Done => None,
        })
        .collect()
}
