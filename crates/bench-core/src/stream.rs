//! Incremental consumption of a streamed completion.
//!
//! Lines are handled strictly in arrival order. Elapsed time is the span
//! between the first and the last fragment (or the `[DONE]` sentinel), not the
//! request latency.

use std::time::Instant;

use futures_util::{Stream, StreamExt};

use crate::clock::{Clock, MonotonicClock};
use crate::schema::{extract_fragment, FragmentSchema};

pub const DATA_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";

/// One piece of generated text as it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub arrived_at: Instant,
    pub schema: FragmentSchema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Sentinel,
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    pub full_text: String,
    pub elapsed_seconds: f64,
    pub fragments: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Continue,
    Done,
}

/// Splits arbitrary byte chunks into lines. Partial lines, including partial
/// UTF-8 sequences, wait for the next chunk.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    // Prefix of `buffer` already known to hold no newline.
    scanned: usize,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            lines.push(String::from_utf8_lossy(&self.buffer[start..end]).into_owned());
            start = end + 1;
            from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        lines
    }

    /// Remaining unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

#[derive(Debug)]
pub struct StreamConsumer<C = MonotonicClock> {
    clock: C,
    accumulator: Vec<String>,
    first_fragment_at: Option<Instant>,
    last_fragment_at: Option<Instant>,
    done: bool,
}

impl StreamConsumer<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for StreamConsumer<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> StreamConsumer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            accumulator: Vec::new(),
            first_fragment_at: None,
            last_fragment_at: None,
            done: false,
        }
    }

    /// Handles one line. Returns [`Feed::Done`] once the sentinel was seen;
    /// later lines are ignored.
    pub fn feed_line(&mut self, line: &str) -> Feed {
        if self.done {
            return Feed::Done;
        }
        let line = line.trim();
        if line.is_empty() {
            return Feed::Continue;
        }
        let payload = match line.strip_prefix(DATA_PREFIX) {
            Some(rest) => rest.trim(),
            None => line,
        };
        if payload == DONE_SENTINEL {
            self.last_fragment_at = Some(self.clock.now());
            self.done = true;
            return Feed::Done;
        }
        match extract_fragment(payload) {
            Some(extracted) => {
                let arrived_at = self.clock.now();
                self.push(Fragment { text: extracted.text, arrived_at, schema: extracted.schema });
            }
            None => tracing::trace!(payload, "no text in stream line"),
        }
        Feed::Continue
    }

    fn push(&mut self, fragment: Fragment) {
        tracing::debug!(schema = ?fragment.schema, len = fragment.text.len(), "fragment");
        self.first_fragment_at.get_or_insert(fragment.arrived_at);
        self.last_fragment_at = Some(fragment.arrived_at);
        self.accumulator.push(fragment.text);
    }

    pub fn finish(self) -> StreamOutcome {
        let elapsed_seconds = match (self.first_fragment_at, self.last_fragment_at) {
            (Some(first), Some(last)) => last.saturating_duration_since(first).as_secs_f64(),
            _ => 0.0,
        };
        let termination = if self.done { Termination::Sentinel } else { Termination::EndOfStream };
        StreamOutcome {
            fragments: self.accumulator.len(),
            full_text: self.accumulator.concat(),
            elapsed_seconds,
            termination,
        }
    }

    pub fn consume_lines<I, S>(mut self, lines: I) -> StreamOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            if self.feed_line(line.as_ref()) == Feed::Done {
                break;
            }
        }
        self.finish()
    }

    /// Consumes a byte stream such as a response body. The stream is dropped
    /// as soon as the sentinel arrives; a stream error aborts consumption.
    pub async fn consume<S, B, E>(mut self, stream: S) -> Result<StreamOutcome, E>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
    {
        futures_util::pin_mut!(stream);
        let mut splitter = LineSplitter::new();
        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in splitter.push(chunk.as_ref()) {
                if self.feed_line(&line) == Feed::Done {
                    break 'read;
                }
            }
        }
        if !self.done {
            if let Some(rest) = splitter.finish() {
                self.feed_line(&rest);
            }
        }
        Ok(self.finish())
    }
}
