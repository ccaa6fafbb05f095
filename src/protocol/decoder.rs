//! Incremental SSE decoding
//!
//! The decoder owns a byte buffer that raw chunks are fed into as they
//! arrive from the transport. A blank line is the sole event delimiter, and
//! it may arrive split across any number of chunks, so the boundary search
//! resumes just before the previous buffer tail instead of rescanning.
//!
//! Field handling follows the EventSource wire rules: `event:`, `data:`
//! (multiple lines joined with `\n`), `id:`, `retry:`; comment lines start
//! with `:`; unknown fields are ignored; CRLF and lone-CR line endings are
//! accepted on decode even though the encoder only ever emits LF.

use bytes::BytesMut;

use super::event::{Event, DEFAULT_TOPIC};

/// Incremental decoder for a stream of SSE frames
///
/// Feed raw chunks with [`feed`](Self::feed), then drain complete events
/// with [`next_event`](Self::next_event). Bytes belonging to a not yet
/// terminated event stay buffered until the delimiter arrives or
/// [`discard_partial`](Self::discard_partial) drops them after a transport
/// failure.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buf: BytesMut,

    /// No event boundary exists before this offset
    scan_pos: usize,
}

impl EventDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk from the transport
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Number of bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete event, if one is buffered.
    ///
    /// Blocks consisting only of comment lines (keep-alives) are consumed
    /// silently. Returns `None` once no complete event remains; any partial
    /// tail stays buffered for the next `feed`.
    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            let (end, delim_len) = match find_boundary(&self.buf, self.scan_pos) {
                Some(found) => found,
                None => {
                    // The delimiter is at most 4 bytes; everything before
                    // the last 3 bytes has been ruled out.
                    self.scan_pos = self.buf.len().saturating_sub(3);
                    return None;
                }
            };

            let block = self.buf.split_to(end + delim_len);
            self.scan_pos = 0;

            if let Some(event) = parse_block(&block[..end]) {
                return Some(event);
            }
        }
    }

    /// Drop any unterminated event fragment.
    ///
    /// Called after a transport failure: a half-received event cannot be
    /// resumed on reconnect and must never be dispatched. Returns `true` if
    /// bytes were discarded.
    pub fn discard_partial(&mut self) -> bool {
        let discarded = !self.buf.is_empty();
        if discarded {
            tracing::debug!(bytes = self.buf.len(), "Discarding partial event");
        }
        self.buf.clear();
        self.scan_pos = 0;
        discarded
    }
}

/// Locate the next blank-line delimiter at or after `from`.
///
/// Returns the block end offset and the delimiter length. The recognized
/// delimiters are `\n\n`, `\r\n\r\n` and `\r\r`.
fn find_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i < buf.len() {
        if buf[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        if buf[i..].starts_with(b"\n\n") || buf[i..].starts_with(b"\r\r") {
            return Some((i, 2));
        }
        i += 1;
    }
    None
}

/// Parse one delimited block into an event.
///
/// Returns `None` for blocks carrying no recognized field (comment-only
/// keep-alive blocks).
fn parse_block(block: &[u8]) -> Option<Event> {
    let mut topic: Option<String> = None;
    let mut data_lines: Vec<String> = Vec::new();
    let mut id: Option<String> = None;
    let mut retry: Option<u64> = None;
    let mut saw_field = false;

    for line in split_lines(block) {
        if line.is_empty() || line[0] == b':' {
            continue;
        }

        let line = String::from_utf8_lossy(line);
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };

        match field {
            "event" => {
                topic = Some(value.to_string());
                saw_field = true;
            }
            "data" => {
                data_lines.push(value.to_string());
                saw_field = true;
            }
            "id" => {
                id = Some(value.to_string());
                saw_field = true;
            }
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    retry = Some(ms);
                    saw_field = true;
                }
            }
            _ => {}
        }
    }

    if !saw_field {
        return None;
    }

    let topic = match topic {
        Some(t) if !t.is_empty() => t,
        _ => DEFAULT_TOPIC.to_string(),
    };

    Some(Event {
        topic,
        data: data_lines.join("\n"),
        id,
        retry,
    })
}

/// Split a block into lines, treating `\r\n`, `\n` and `\r` as terminators
fn split_lines(block: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < block.len() {
        match block[i] {
            b'\n' => {
                lines.push(&block[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&block[start..i]);
                i += 1;
                if i < block.len() && block[i] == b'\n' {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }

    if start < block.len() {
        lines.push(&block[start..]);
    }

    lines
}
