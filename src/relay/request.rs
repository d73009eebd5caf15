use crate::config::GenerationDefaults;
use serde_json::{Map, Number, Value};
use std::num::IntErrorKind;
use thiserror::Error;

/// Optional runtime parameters forwarded verbatim when the caller sets them.
pub const PASSTHROUGH_FIELDS: &[&str] = &["system", "context", "options", "format", "template"];

/// Client input errors, reported as `400 {"error": <message>}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("prompt is required")]
    MissingPrompt,

    #[error("num_predict must be an integer")]
    InvalidNumPredict,
}

/// A validated generation request with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Trimmed, never empty.
    pub prompt: String,
    pub model: String,
    /// Usually a duration string such as `"5m"`; the runtime also takes numbers.
    pub keep_alive: Value,
    /// Always positive.
    pub num_predict: i64,
    pub stream: bool,
    /// Pass-through fields present in the inbound payload, in payload order.
    pub passthrough: Map<String, Value>,
}

impl GenerationRequest {
    /// Parse a raw request body. Anything that is not a JSON object is read as
    /// an empty object, which then fails the prompt check.
    pub fn from_body(body: &[u8], defaults: &GenerationDefaults) -> Result<Self, ValidationError> {
        let payload = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self::from_payload(&payload, defaults)
    }

    pub fn from_payload(
        payload: &Map<String, Value>,
        defaults: &GenerationDefaults,
    ) -> Result<Self, ValidationError> {
        let prompt = payload
            .get("prompt")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingPrompt)?
            .to_string();

        let model = payload
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| defaults.model.clone());

        let keep_alive = payload
            .get("keep_alive")
            .filter(|v| is_truthy(v))
            .cloned()
            .unwrap_or_else(|| Value::String(defaults.keep_alive.clone()));

        let num_predict = match payload.get("num_predict") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(coerce_integer(raw).ok_or(ValidationError::InvalidNumPredict)?),
        }
        .filter(|n| *n > 0)
        .unwrap_or(i64::from(defaults.num_predict));

        let stream = payload.get("stream").map(is_truthy).unwrap_or(true);

        let passthrough = PASSTHROUGH_FIELDS
            .iter()
            .filter_map(|key| payload.get_key_value(*key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            prompt,
            model,
            keep_alive,
            num_predict,
            stream,
            passthrough,
        })
    }

    /// The body sent to the runtime's generate endpoint.
    pub fn to_runtime_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("prompt".into(), Value::String(self.prompt.clone()));
        body.insert("model".into(), Value::String(self.model.clone()));
        body.insert("keep_alive".into(), self.keep_alive.clone());
        body.insert("num_predict".into(), Value::Number(Number::from(self.num_predict)));
        body.insert("stream".into(), Value::Bool(self.stream));
        for (key, value) in &self.passthrough {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

/// JSON truthiness: null, false, zero, and empty strings/arrays/objects are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Integers pass through, floats truncate toward zero, booleans count as 0/1,
/// and strings are parsed as trimmed base-10 integers. Magnitudes beyond `i64`
/// saturate.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            // `as` saturates out-of-range floats
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_integer(s.trim()),
        _ => None,
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    match s.parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}
