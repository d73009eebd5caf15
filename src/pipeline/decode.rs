//! Streaming decoder (runtime bytes -> relayed chunks).
//!
//! The runtime streams NDJSON: one JSON object per line. Lines are cut on the
//! raw bytes, so multi-byte UTF-8 sequences split across network reads are
//! reassembled before decoding.

use crate::pipeline::{invalid_line_chunk, is_done, upstream_error_chunk, ChunkStream};
use crate::BoxStream;
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::warn;

enum DecodeState {
    Streaming {
        input: BoxStream<'static, Bytes>,
        buf: BytesMut,
        /// Prefix of `buf` already known to hold no `\n`.
        scanned: usize,
    },
    Finished,
}

/// Lazily turn a runtime byte stream into the chunks forwarded to the caller.
///
/// - blank lines are skipped
/// - a line that is not valid JSON becomes an `invalid json` error chunk
/// - the stream ends right after the first chunk with `"done": true`
/// - a read error becomes one `{"error": ...}` chunk and ends the stream
/// - a trailing line without a newline is decoded at EOF
///
/// The upstream body is dropped as soon as the stream finishes, or when the
/// returned stream is dropped.
pub fn relay_chunks(input: BoxStream<'static, Bytes>) -> ChunkStream {
    let initial = DecodeState::Streaming {
        input,
        buf: BytesMut::new(),
        scanned: 0,
    };

    let stream = stream::unfold(initial, |state| async move {
        let DecodeState::Streaming {
            mut input,
            mut buf,
            mut scanned,
        } = state
        else {
            return None;
        };

        loop {
            if let Some(pos) = buf[scanned..].iter().position(|b| *b == b'\n') {
                let idx = scanned + pos;
                let line = buf.split_to(idx + 1);
                scanned = 0;
                let Some(chunk) = decode_line(&line[..idx]) else {
                    continue;
                };
                let next = if is_done(&chunk) {
                    DecodeState::Finished
                } else {
                    DecodeState::Streaming {
                        input,
                        buf,
                        scanned,
                    }
                };
                return Some((chunk, next));
            }
            scanned = buf.len();

            match input.next().await {
                Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    warn!(error = %e, "Runtime stream failed mid-response");
                    return Some((upstream_error_chunk(&e), DecodeState::Finished));
                }
                None => {
                    let rest = buf.split();
                    return decode_line(&rest).map(|chunk| (chunk, DecodeState::Finished));
                }
            }
        }
    });

    Box::pin(stream)
}

/// Decode one line (without its `\n`). Returns `None` for blank lines.
pub fn decode_line(line: &[u8]) -> Option<Value> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = String::from_utf8_lossy(line);
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(v) => Some(v),
        Err(_) => Some(invalid_line_chunk(&text)),
    }
}
