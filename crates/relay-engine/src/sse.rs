//! SSE line framing and classification.

use bytes::{Buf, BytesMut};

/// Prefix of an SSE data line.
pub const DATA_PREFIX: &str = "data: ";

/// Terminal sentinel payload closing an OpenAI-style stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// The full terminal line, as forwarded when the upstream omits it.
#[must_use]
pub fn done_line() -> String {
    format!("{DATA_PREFIX}{DONE_SENTINEL}")
}

/// One scanned SSE line, classified for the relay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// A `data: ` event carrying the given payload.
    Data(&'a str),
    /// The terminal sentinel event.
    Done,
    /// Framing noise (blank lines, comments, other field names); discarded.
    Noise,
}

/// Classify one raw SSE line.
///
/// Lines shorter than the data prefix, and lines opening with anything other
/// than the data prefix or the sentinel token, are noise. A payload that
/// starts with the sentinel terminates the stream.
#[must_use]
pub fn classify(line: &str) -> SseLine<'_> {
    let Some(head) = line.get(..DATA_PREFIX.len()) else {
        return SseLine::Noise;
    };
    if head != DATA_PREFIX && head != DONE_SENTINEL {
        return SseLine::Noise;
    }
    let payload = &line[DATA_PREFIX.len()..];
    if payload.starts_with(DONE_SENTINEL) {
        SseLine::Done
    } else {
        SseLine::Data(payload)
    }
}

/// Reassembles newline-delimited lines from arbitrarily chunked bytes.
///
/// Upstream transports deliver byte chunks that split lines anywhere; the
/// buffer joins them back together and strips `\n` / `\r\n` terminators.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk of upstream bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf.split_to(pos);
        self.buf.advance(1);
        Some(decode_line(&line))
    }

    /// Drain the unterminated remainder at end of stream, if any.
    pub fn take_residue(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(decode_line(&rest))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let trimmed = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(trimmed).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_data_line() {
        assert_eq!(
            classify("data: {\"x\":1}"),
            SseLine::Data("{\"x\":1}")
        );
    }

    #[test]
    fn test_classify_done_line() {
        assert_eq!(classify("data: [DONE]"), SseLine::Done);
    }

    #[test]
    fn test_classify_short_line_is_noise() {
        assert_eq!(classify(""), SseLine::Noise);
        assert_eq!(classify("data:"), SseLine::Noise);
    }

    #[test]
    fn test_classify_other_fields_are_noise() {
        assert_eq!(classify("event: ping"), SseLine::Noise);
        assert_eq!(classify(": keep-alive comment"), SseLine::Noise);
        assert_eq!(classify("id: 42-and-more"), SseLine::Noise);
    }

    #[test]
    fn test_classify_done_with_trailing_text() {
        // A payload that merely starts with the sentinel still terminates.
        assert_eq!(classify("data: [DONE] trailing"), SseLine::Done);
    }

    #[test]
    fn test_line_buffer_splits_lines() {
        let mut buf = LineBuffer::new();
        buf.push(b"data: one\ndata: two\n");
        assert_eq!(buf.next_line().as_deref(), Some("data: one"));
        assert_eq!(buf.next_line().as_deref(), Some("data: two"));
        assert_eq!(buf.next_line(), None);
    }

    #[test]
    fn test_line_buffer_joins_partial_chunks() {
        let mut buf = LineBuffer::new();
        buf.push(b"data: {\"conte");
        assert_eq!(buf.next_line(), None);
        buf.push(b"nt\":\"hi\"}\n");
        assert_eq!(buf.next_line().as_deref(), Some("data: {\"content\":\"hi\"}"));
    }

    #[test]
    fn test_line_buffer_strips_crlf() {
        let mut buf = LineBuffer::new();
        buf.push(b"data: x\r\n");
        assert_eq!(buf.next_line().as_deref(), Some("data: x"));
    }

    #[test]
    fn test_line_buffer_residue() {
        let mut buf = LineBuffer::new();
        buf.push(b"data: tail");
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.take_residue().as_deref(), Some("data: tail"));
        assert_eq!(buf.take_residue(), None);
    }
}
