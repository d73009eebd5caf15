//! # ollama-relay
//!
//! Streaming HTTP relay in front of a locally running Ollama runtime.
//!
//! ## Overview
//!
//! The relay accepts generation requests on `POST /api/generate`, fills in
//! configured defaults, forwards them to the runtime and relays the answer:
//! either the runtime's buffered body verbatim, or its streamed output as
//! newline-delimited JSON, one chunk at a time and in order. A background task
//! warms the configured models once per process so the first real request does
//! not pay the model load time.
//!
//! ## Core Behaviour
//!
//! - **Fail fast on bad input**: a blank prompt or a non-integer `num_predict`
//!   is a `400` before anything is sent upstream
//! - **Never break the stream**: runtime failures and malformed lines become
//!   in-band JSON error objects, so callers always get a well-formed body
//! - **Forward-only relay**: at most one undecoded line is buffered; a caller
//!   disconnect drops the upstream connection
//! - **One warm-up per process**: guarded by an atomic flag, however many
//!   times it is triggered
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ollama_relay::{server, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::load();
//!     let (app, warmup) = server::build_app(&config)?;
//!     warmup.schedule();
//!
//!     let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
//!     server::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Runtime address, generation defaults, file locations |
//! | [`discovery`] | Which models to pre-warm |
//! | [`warmup`] | One-shot background warm-up |
//! | [`transport`] | HTTP client for the runtime |
//! | [`pipeline`] | NDJSON relay of streamed runtime output |
//! | [`relay`] | Request validation and the generate handler |
//! | [`server`] | Router, static assets, graceful shutdown |

pub mod config;
pub mod discovery;
pub mod pipeline;
pub mod relay;
pub mod server;
pub mod transport;
pub mod warmup;

pub use config::{GenerationDefaults, RelayConfig};
pub use discovery::ModelDiscovery;
pub use relay::{GenerationRequest, RelayState, ValidationError};
pub use transport::RuntimeClient;
pub use warmup::{ModelWarmer, WarmupScheduler};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
