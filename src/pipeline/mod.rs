//! # Relay pipeline
//!
//! Turns the runtime's streamed response into the newline-delimited JSON the
//! caller receives.
//!
//! ```text
//! Runtime bytes → relay_chunks → Chunks → encode_chunk → Caller bytes
//!      │               │                       │
//!    HTTP          line split,             compact JSON
//!    body          JSON decode,            + "\n"
//!                  done / error handling
//! ```
//!
//! The pipeline is forward-only: it holds at most one undecoded line in memory,
//! never reorders chunks, and cannot be restarted.

pub mod decode;

pub use decode::{decode_line, relay_chunks};

use crate::Error;
use bytes::Bytes;
use futures::Stream;
use serde_json::{json, Value};
use std::pin::Pin;

/// Error message carried by chunks that replace undecodable runtime lines.
pub const INVALID_JSON_ERROR: &str = "invalid json from ollama";

/// Infallible stream of chunks ready to forward. Failures are already folded
/// into in-band error chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Value> + Send + 'static>>;

/// Whether a chunk marks the end of a generation.
pub fn is_done(chunk: &Value) -> bool {
    chunk.get("done").and_then(Value::as_bool) == Some(true)
}

/// Serialize a chunk as one NDJSON line.
pub fn encode_chunk(chunk: &Value) -> Bytes {
    let mut line = chunk.to_string();
    line.push('\n');
    Bytes::from(line)
}

/// The in-band error object sent when talking to the runtime fails.
pub fn upstream_error_chunk(err: &Error) -> Value {
    json!({ "error": upstream_error_message(err) })
}

/// The diagnostic object replacing a runtime line that is not valid JSON.
pub fn invalid_line_chunk(raw: &str) -> Value {
    json!({ "error": INVALID_JSON_ERROR, "raw": raw })
}

fn upstream_error_message(err: &Error) -> String {
    match err {
        // Drop the "Network transport error" prefix; callers see the cause.
        Error::Transport(inner) => inner.to_string(),
        other => other.to_string(),
    }
}
