use crate::transport::TransportError;
use crate::{BoxStream, Error, ErrorContext, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Bound on establishing a connection to the runtime, for every call.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound on a whole buffered (non-streaming) call, including reading the body.
pub const BUFFERED_TIMEOUT: Duration = Duration::from_secs(30);

const WARMUP_PROMPT: &str = "ping";
const WARMUP_NUM_PREDICT: u32 = 5;

/// Client for the runtime's `POST /api/generate` endpoint.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    client: reqwest::Client,
    generate_url: Url,
}

impl RuntimeClient {
    pub fn new(generate_url: Url) -> Result<Self> {
        // No client-wide timeout: streaming reads are unbounded and buffered
        // calls set their own per-request limit.
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            client,
            generate_url,
        })
    }

    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    /// Issue a non-streaming call and return the runtime's body untouched.
    pub async fn generate_buffered(&self, body: &Value) -> Result<Bytes> {
        let resp = self
            .client
            .post(self.generate_url.clone())
            .timeout(BUFFERED_TIMEOUT)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(TransportError::Http)?;

        let bytes = resp.bytes().await.map_err(TransportError::Http)?;
        Ok(bytes)
    }

    /// Issue a streaming call. Only the connect phase is time-bounded; the
    /// returned stream yields body bytes as they arrive and closes the
    /// connection when dropped.
    pub async fn generate_stream(&self, body: &Value) -> Result<BoxStream<'static, Bytes>> {
        let resp = self
            .client
            .post(self.generate_url.clone())
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(TransportError::Http)?;

        let byte_stream = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Box::pin(byte_stream))
    }

    /// Ask the runtime to load `model` with a tiny non-streaming generation.
    pub async fn warm(&self, model: &str, keep_alive: &str) -> Result<()> {
        let body = json!({
            "prompt": WARMUP_PROMPT,
            "model": model,
            "stream": false,
            "keep_alive": keep_alive,
            "num_predict": WARMUP_NUM_PREDICT,
        });
        self.generate_buffered(&body).await.map_err(|e| {
            Error::runtime_with_context(
                format!("failed to load model: {}", e),
                ErrorContext::new()
                    .with_details(model)
                    .with_source("warmup"),
            )
        })?;
        Ok(())
    }
}
