//! Streaming response forwarding (SSE)
//!
//! Upstream bytes are forwarded untouched. A tap feeds the same bytes through
//! the shared event parser so a summary can be logged when the stream ends
//! or the client goes away.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::time::Instant;
use uuid::Uuid;

use crate::stats::{format_summary, StreamSummary};
use crate::stream::{EventParser, StreamEvent};
use crate::upstream::ByteStream;

struct StreamTap<F: FnOnce(StreamSummary)> {
    parser: EventParser,
    summary: StreamSummary,
    started: Instant,
    report: Option<F>,
}

impl<F: FnOnce(StreamSummary)> StreamTap<F> {
    fn observe(&mut self, chunk: &[u8]) {
        self.summary.bytes += chunk.len();
        let events = self.parser.feed(chunk);
        self.record(events);
    }

    fn record(&mut self, events: Vec<StreamEvent>) {
        for event in events {
            match event {
                StreamEvent::Fragment(fragment) => self.summary.record_fragment(&fragment),
                StreamEvent::Done => self.summary.saw_done = true,
            }
        }
    }
}

impl<F: FnOnce(StreamSummary)> Drop for StreamTap<F> {
    fn drop(&mut self) {
        let events = self.parser.finish();
        self.record(events);
        self.summary.elapsed = self.started.elapsed();
        if let Some(report) = self.report.take() {
            report(std::mem::take(&mut self.summary));
        }
    }
}

/// Forward `body` unchanged, handing the summary to `report` once the stream
/// is dropped
pub fn tap_stream_with<F>(
    body: ByteStream,
    summary: StreamSummary,
    report: F,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static
where
    F: FnOnce(StreamSummary) + Send + 'static,
{
    let mut tap = StreamTap {
        parser: EventParser::new(),
        summary,
        started: Instant::now(),
        report: Some(report),
    };

    body.map(move |chunk| {
        match &chunk {
            Ok(bytes) => {
                tracing::trace!("Forwarding SSE chunk ({} bytes)", bytes.len());
                tap.observe(bytes);
            }
            Err(e) => tracing::error!(error = %e, "Error reading upstream stream chunk"),
        }
        chunk
    })
}

/// Forward `body` unchanged and log a summary line when it ends
pub fn tap_stream(
    body: ByteStream,
    summary: StreamSummary,
    request_id: Uuid,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    tap_stream_with(body, summary, move |summary| {
        tracing::info!(request_id = %request_id, "{}", format_summary(&summary));
    })
}
