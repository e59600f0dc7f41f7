//! Throttled incremental rendering.
//!
//! Fragments can arrive at sub-millisecond intervals; re-rendering on every
//! one would swamp the sink. The renderer buffers fragments and flushes at
//! most once per [`FLUSH_INTERVAL`], flushing immediately when the interval
//! has already elapsed and otherwise arming a single deadline that coalesces
//! every fragment received in the meantime.

use std::mem;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

pub const FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Marker appended to the sink output while the message is still streaming.
pub const STREAMING_CURSOR: &str = "▊";

#[derive(Error, Debug)]
#[error("{0}")]
pub struct FormatError(pub String);

/// External text-to-markup formatter (markdown + math in the real client).
/// May fail on malformed input; the renderer degrades instead of propagating.
pub trait TextFormatter: Send {
    fn format(&self, text: &str) -> Result<String, FormatError>;
}

/// Where formatted output goes. `streaming` is true until the message is
/// finalized so the sink can show a transient cursor.
pub trait RenderSink: Send {
    fn render(&mut self, markup: &str, streaming: bool);
    fn scroll_to_bottom(&mut self);
}

pub struct ThrottledRenderer<F, S> {
    formatter: F,
    sink: S,
    committed: String,
    pending: String,
    last_flush: Option<Instant>,
    deadline: Option<Instant>,
    finished: bool,
}

impl<F: TextFormatter, S: RenderSink> ThrottledRenderer<F, S> {
    pub fn new(formatter: F, sink: S) -> Self {
        Self {
            formatter,
            sink,
            committed: String::new(),
            pending: String::new(),
            last_flush: None,
            deadline: None,
            finished: false,
        }
    }

    /// Append a fragment. Flushes synchronously when the interval has already
    /// elapsed since the last flush; otherwise arms exactly one deadline for
    /// the remainder of the interval.
    pub fn add_chunk(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.pending.push_str(text);

        match self.last_flush {
            Some(last) if last.elapsed() < FLUSH_INTERVAL => {
                if self.deadline.is_none() {
                    self.deadline = Some(last + FLUSH_INTERVAL);
                }
            }
            _ => self.flush(),
        }
    }

    /// The armed deferred flush, if any. The caller's select loop sleeps on
    /// this and calls [`flush`](Self::flush) when it fires.
    pub fn next_flush(&self) -> Option<Instant> {
        self.deadline
    }

    /// Commit pending text and push the formatted whole to the sink. A no-op
    /// when nothing is pending (the deadline is still disarmed).
    pub fn flush(&mut self) {
        self.deadline = None;
        if self.pending.is_empty() {
            return;
        }

        let pending = mem::take(&mut self.pending);
        self.committed.push_str(&pending);
        self.render();
        self.last_flush = Some(Instant::now());
    }

    /// Cancel any armed flush, commit the remainder, and render without the
    /// streaming marker. Idempotent.
    pub fn finalize(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.deadline = None;

        let pending = mem::take(&mut self.pending);
        self.committed.push_str(&pending);
        self.render();
        self.last_flush = Some(Instant::now());
    }

    /// Reopen the stream for a continuation round after a finalize.
    pub fn resume(&mut self) {
        self.finished = false;
    }

    fn render(&mut self) {
        let markup = match self.formatter.format(&self.committed) {
            Ok(markup) => markup,
            Err(error) => {
                log::warn!("formatter failed, rendering fallback: {error}");
                format!(
                    "{}<span class=\"render-error\">⚠ {}</span>",
                    escape_markup(&self.committed),
                    escape_markup(&error.to_string()),
                )
            }
        };

        self.sink.render(&markup, !self.finished);
        self.sink.scroll_to_bottom();
    }

    /// Exactly the text that has been handed to the sink.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}
