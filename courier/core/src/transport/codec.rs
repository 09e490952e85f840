//! Line Codec
//!
//! Decoder state machine for newline-delimited JSON. The streaming-request
//! transport receives the response body as arbitrary byte chunks; a chunk may
//! end mid-line and may carry several complete lines. The decoder buffers
//! bytes and yields one decoded [`Message`] per complete line.
//!
//! Blank lines are skipped. A line that is not a JSON object is a decode
//! failure, not silently dropped; the coordinator surfaces it to the caller.

use crate::error::CourierError;
use crate::message::Message;

/// Minimum buffer capacity for the decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Buffering decoder for newline-delimited JSON messages
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Position up to which the buffer has been consumed
    read_pos: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
        }
    }

    /// Append received bytes to the buffer
    pub fn push(&mut self, data: &[u8]) {
        // Compact once a large prefix has been consumed
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next complete line.
    ///
    /// Returns:
    /// - `Ok(Some(msg))` when a complete non-blank line was decoded
    /// - `Ok(None)` when more bytes are needed
    /// - `Err(..)` when a complete line is not a valid JSON object
    pub fn next_message(&mut self) -> Result<Option<Message>, CourierError> {
        loop {
            let unread = &self.buffer[self.read_pos..];
            let Some(offset) = unread.iter().position(|&b| b == b'\n') else {
                return Ok(None);
            };

            let line_end = self.read_pos + offset;
            let line = &self.buffer[self.read_pos..line_end];
            self.read_pos = line_end + 1;

            let text = String::from_utf8_lossy(line);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Message::decode(trimmed).map(Some);
        }
    }

    /// Number of unconsumed bytes in the buffer
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_line() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"chunk\":\"a\"}\n");

        let msg = decoder.next_message().unwrap().unwrap();
        assert_eq!(msg.get("chunk").and_then(|v| v.as_str()), Some("a"));
        assert!(decoder.next_message().unwrap().is_none());
    }

    #[test]
    fn test_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"chunk\":");
        assert!(decoder.next_message().unwrap().is_none());

        decoder.push(b"\"partial\"}\n");
        let msg = decoder.next_message().unwrap().unwrap();
        assert_eq!(msg.get("chunk").and_then(|v| v.as_str()), Some("partial"));
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"seq\":1}\n{\"seq\":2}\n{\"seq\":3}\n");

        for expected in 1..=3 {
            let msg = decoder.next_message().unwrap().unwrap();
            assert_eq!(msg.get("seq").and_then(|v| v.as_i64()), Some(expected));
        }
        assert!(decoder.next_message().unwrap().is_none());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"\n\n{\"done\":true}\n\n");

        let msg = decoder.next_message().unwrap().unwrap();
        assert!(msg.flag("done"));
        assert!(decoder.next_message().unwrap().is_none());
    }

    #[test]
    fn test_incomplete_trailing_line_waits() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"done\":true}");
        // No newline yet, so no message yet
        assert!(decoder.next_message().unwrap().is_none());
        decoder.push(b"\n");
        assert!(decoder.next_message().unwrap().unwrap().flag("done"));
    }

    #[test]
    fn test_invalid_line_is_error() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"not json\n");
        assert!(matches!(
            decoder.next_message(),
            Err(CourierError::TransportFailure(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"seq\":1}\n");
        decoder.clear();
        assert_eq!(decoder.available(), 0);
        assert!(decoder.next_message().unwrap().is_none());
    }
}
