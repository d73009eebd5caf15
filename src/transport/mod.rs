//! HTTP transport to the model runtime.

mod http;

pub use http::{RuntimeClient, BUFFERED_TIMEOUT, CONNECT_TIMEOUT};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
