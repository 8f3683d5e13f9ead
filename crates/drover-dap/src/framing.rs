//! DAP wire framing: Content-Length header plus JSON body.

use crate::error::DapError;

/// Encode a JSON value into a DAP wire-format message with
/// Content-Length header.
pub fn encode_message(value: &serde_json::Value) -> Vec<u8> {
    let body = value.to_string();
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut buf = Vec::with_capacity(header.len() + body.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(body.as_bytes());
    buf
}

/// Incremental frame decoder over a byte stream.
///
/// Inbound bytes arrive in arbitrary chunks: a message may be split
/// across reads and one read may carry several messages. The decoder
/// buffers everything fed to it; [`next_message`](Self::next_message)
/// yields each complete message in order and leaves any trailing
/// partial bytes buffered for the next read.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes to the buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete message, if one is buffered.
    ///
    /// Returns `Ok(None)` when the buffer holds only a partial
    /// message. A complete header block without a Content-Length
    /// line, or a body that is not valid JSON, is a `Protocol` error;
    /// the transport is expected to fail on it rather than attempt to
    /// resynchronize.
    pub fn next_message(&mut self) -> Result<Option<serde_json::Value>, DapError> {
        let Some(sep_pos) = find_subslice(&self.buf, b"\r\n\r\n") else {
            return Ok(None);
        };

        let header = String::from_utf8_lossy(&self.buf[..sep_pos]);
        let content_length = parse_content_length(&header)?;

        let body_start = sep_pos + 4;
        let total = body_start + content_length;
        if self.buf.len() < total {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_slice(&self.buf[body_start..total])
            .map_err(|e| DapError::Protocol(format!("body is not valid JSON: {e}")))?;
        self.buf.drain(..total);
        Ok(Some(value))
    }
}

/// Parse the Content-Length value from the header section.
fn parse_content_length(header: &str) -> Result<usize, DapError> {
    for line in header.split("\r\n") {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let value = value.trim();
            return value.parse::<usize>().map_err(|e| {
                DapError::Protocol(format!("invalid Content-Length value '{value}': {e}"))
            });
        }
    }
    Err(DapError::Protocol("missing Content-Length header".into()))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> serde_json::Value {
        serde_json::json!({
            "seq": 3,
            "type": "event",
            "event": "stopped",
            "body": { "reason": "breakpoint", "threadId": 1 }
        })
    }

    #[test]
    fn framing_encode_roundtrip() {
        let msg = sample_event();
        let encoded = encode_message(&msg);
        let text = String::from_utf8(encoded.clone()).unwrap();
        assert!(text.starts_with("Content-Length: "));
        assert!(text.contains("\r\n\r\n"));

        let mut decoder = FrameDecoder::new();
        decoder.extend(&encoded);
        assert_eq!(decoder.next_message().unwrap(), Some(msg));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn framing_partial_message_stays_buffered() {
        let encoded = encode_message(&sample_event());
        let mut decoder = FrameDecoder::new();
        decoder.extend(&encoded[..5]);
        assert_eq!(decoder.next_message().unwrap(), None);
        assert_eq!(decoder.buffered(), 5);
    }

    #[test]
    fn framing_split_at_every_offset() {
        let msg = sample_event();
        let encoded = encode_message(&msg);
        for split in 1..encoded.len() {
            let mut decoder = FrameDecoder::new();
            decoder.extend(&encoded[..split]);
            assert_eq!(decoder.next_message().unwrap(), None, "split at {split}");
            decoder.extend(&encoded[split..]);
            assert_eq!(decoder.next_message().unwrap().as_ref(), Some(&msg));
            assert_eq!(decoder.next_message().unwrap(), None);
        }
    }

    #[test]
    fn framing_multiple_messages_in_one_read() {
        let first = sample_event();
        let second = serde_json::json!({"seq": 4, "type": "event", "event": "continued"});
        let mut bytes = encode_message(&first);
        bytes.extend_from_slice(&encode_message(&second));

        let mut decoder = FrameDecoder::new();
        decoder.extend(&bytes);
        assert_eq!(decoder.next_message().unwrap(), Some(first));
        assert_eq!(decoder.next_message().unwrap(), Some(second));
        assert_eq!(decoder.next_message().unwrap(), None);
    }

    #[test]
    fn framing_extra_headers_tolerated() {
        let body = r#"{"seq":1,"type":"event","event":"output"}"#;
        let framed = format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let mut decoder = FrameDecoder::new();
        decoder.extend(framed.as_bytes());
        let msg = decoder.next_message().unwrap().unwrap();
        assert_eq!(msg["event"], "output");
    }

    #[test]
    fn framing_missing_content_length_is_protocol_error() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(b"Content-Type: application/json\r\n\r\n{}");
        let err = decoder.next_message().unwrap_err();
        assert!(matches!(err, DapError::Protocol(_)));
        assert!(err.to_string().contains("missing Content-Length"));
    }

    #[test]
    fn framing_invalid_content_length_value() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(b"Content-Length: twelve\r\n\r\n{}");
        let err = decoder.next_message().unwrap_err();
        assert!(err.to_string().contains("invalid Content-Length"));
    }

    #[test]
    fn framing_bad_json_body_is_protocol_error() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(b"Content-Length: 3\r\n\r\nnot");
        let err = decoder.next_message().unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn framing_incomplete_body_waits() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(b"Content-Length: 100\r\n\r\n{\"short\":true}");
        assert_eq!(decoder.next_message().unwrap(), None);
    }
}
