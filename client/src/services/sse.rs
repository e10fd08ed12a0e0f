//! # Server-Sent Events Parsing
//!
//! Line buffering for `text/event-stream` bodies read as arbitrary byte
//! chunks: lines are split on `\n`, a trailing partial line is kept across
//! reads, and only lines starting with `data: ` yield payloads.

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

const DATA_PREFIX: &str = "data: ";

/// Incremental SSE line splitter
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Bytes after the last `\n` seen so far
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the `data: ` payloads of every completed line.
    ///
    /// Works on bytes so a multi-byte character split across chunks is
    /// reassembled before decoding.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].iter().position(|&b| b == b'\n') {
            let line = &self.pending[consumed..consumed + offset];
            consumed += offset + 1;

            let line = String::from_utf8_lossy(line);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(data) = line.strip_prefix(DATA_PREFIX) {
                payloads.push(data.to_string());
            } else if !line.is_empty() {
                trace!(line = %line, "Skipping non-data SSE line");
            }
        }
        self.pending.drain(..consumed);
        payloads
    }

    /// Bytes held back waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Drain a byte stream, parse each `data: ` payload as `T` and forward it.
///
/// Malformed payloads are logged and dropped; the stream keeps going.
/// Stops at the end of the stream, on a read error, when the receiver is
/// gone, or after forwarding a message for which `is_terminal` returns true.
/// Returns the number of messages forwarded.
pub async fn forward_events<S, B, E, T>(
    mut stream: S,
    tx: mpsc::Sender<T>,
    is_terminal: impl Fn(&T) -> bool,
) -> usize
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    T: DeserializeOwned,
{
    let mut buffer = SseLineBuffer::new();
    let mut forwarded = 0;

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "Error reading SSE stream");
                break;
            }
        };

        for payload in buffer.push(chunk.as_ref()) {
            let message = match serde_json::from_str::<T>(&payload) {
                Ok(message) => message,
                Err(e) => {
                    warn!(
                        error = %e,
                        payload = %shared::truncate_preview(&payload, 100),
                        "Failed to parse SSE event"
                    );
                    continue;
                }
            };
            let terminal = is_terminal(&message);
            if tx.send(message).await.is_err() {
                debug!("SSE receiver dropped, stopping");
                return forwarded;
            }
            forwarded += 1;
            if terminal {
                debug!(forwarded, "Terminal SSE event received");
                return forwarded;
            }
        }
    }

    if buffer.pending_len() > 0 {
        debug!(bytes = buffer.pending_len(), "SSE stream ended with an unterminated line");
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use shared::dto::NegotiationMessage;

    #[test]
    fn test_partial_lines_carry_over() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(b"data: {\"a\"").is_empty());
        assert_eq!(buffer.push(b":1}\n\ndata: 2\n"), vec!["{\"a\":1}".to_string(), "2".to_string()]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer.push(b"event: ping\r\n: comment\r\nid: 4\r\ndata: x\r\n");
        assert_eq!(payloads, vec!["x".to_string()]);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "data: 합의\n".as_bytes();
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(&text[..8]).is_empty());
        assert_eq!(buffer.push(&text[8..]), vec!["합의".to_string()]);
    }

    #[tokio::test]
    async fn test_forward_events_skips_malformed_and_stops_at_end() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"type\":\"START\"}\n".to_vec()),
            Ok(b"data: {not json}\n".to_vec()),
            Ok(b"data: {\"type\":\"PROPOSE\",\"round\":1}\ndata: {\"type\":\"END\"}\n".to_vec()),
            Ok(b"data: {\"type\":\"PROPOSE\"}\n".to_vec()),
        ];
        let (tx, mut rx) = mpsc::channel(16);
        let forwarded = forward_events(stream::iter(chunks), tx, NegotiationMessage::is_terminal).await;
        assert_eq!(forwarded, 3);

        let mut kinds = Vec::new();
        while let Some(msg) = rx.recv().await {
            kinds.push(msg.kind());
        }
        assert_eq!(kinds, vec!["START", "PROPOSE", "END"]);
    }

    #[tokio::test]
    async fn test_forward_events_stops_on_read_error() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"type\":\"START\"}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: {\"type\":\"END\"}\n".to_vec()),
        ];
        let (tx, _rx) = mpsc::channel(16);
        let forwarded = forward_events(stream::iter(chunks), tx, NegotiationMessage::is_terminal).await;
        assert_eq!(forwarded, 1);
    }
}
