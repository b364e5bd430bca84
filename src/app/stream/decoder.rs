//! Line framing for newline-delimited JSON bodies
//!
//! Chunks arrive at arbitrary byte boundaries: a line, or even a multi-byte
//! character, may be split across reads. [`LineDecoder`] buffers raw bytes and
//! only hands out complete lines; the trailing partial line stays buffered
//! until the next chunk.

use tracing::{debug, warn};

use crate::app::models::StreamEvent;

/// Accumulates chunk bytes and yields complete lines
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finishes
    ///
    /// Blank lines are skipped and a trailing `\r` is stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            if let Some(line) = decode_line(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        lines
    }

    /// Take whatever remains after end-of-stream as a final line
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Bytes currently waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse one line into an event; malformed lines are logged and dropped
pub fn parse_event(line: &str) -> Option<StreamEvent> {
    match serde_json::from_str::<StreamEvent>(line) {
        Ok(event) => {
            debug!("Decoded '{}' event", event.kind());
            Some(event)
        }
        Err(e) => {
            warn!("Skipping malformed stream line ({}): {}", e, truncate(line, 120));
            None
        }
    }
}

fn truncate(line: &str, max: usize) -> &str {
    match line.char_indices().nth(max) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
