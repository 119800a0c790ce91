//! Per-stream summary for forwarded responses

use std::time::Duration;

/// What the relay observed while forwarding one stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub model: String,
    pub attempts: u32,
    pub bytes: usize,
    pub fragments: usize,
    pub chars: usize,
    pub saw_done: bool,
    pub elapsed: Duration,
}

impl StreamSummary {
    pub fn new(model: impl Into<String>, attempts: u32) -> Self {
        Self {
            model: model.into(),
            attempts,
            ..Default::default()
        }
    }

    pub fn record_fragment(&mut self, fragment: &str) {
        self.fragments += 1;
        self.chars += fragment.chars().count();
    }

    /// Fragments per second over the whole stream
    pub fn fragments_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.fragments as f64 / secs
        } else {
            0.0
        }
    }
}

/// Compact one-line summary
pub fn format_summary(s: &StreamSummary) -> String {
    let status = if s.saw_done { "done" } else { "interrupted" };
    format!(
        "← model={} attempts={} fragments={} chars={} bytes={} {:.1}ms ({:.1} frag/s) {}",
        s.model,
        s.attempts,
        s.fragments,
        s.chars,
        s.bytes,
        s.elapsed.as_secs_f64() * 1000.0,
        s.fragments_per_second(),
        status
    )
}
