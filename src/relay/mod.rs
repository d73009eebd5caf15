//! # Generate relay
//!
//! Accepts a generation request, validates it, merges configured defaults and
//! forwards it to the runtime. The response is either the runtime's buffered
//! body verbatim or a live NDJSON relay of its streamed output.
//!
//! Per streaming request:
//!
//! ```text
//! AWAIT_CONNECT ──ok──▶ STREAMING ──done / EOF──▶ DONE
//!       │                   │
//!       │                   └──read error──▶ ERROR_EMITTED
//!       └──connect/status error──────────────▶ ERROR_EMITTED
//! ```
//!
//! Once `DONE` or `ERROR_EMITTED` is reached the response body ends and the
//! upstream connection is released.

mod handler;
mod request;

pub use handler::{handle_generate, relay_generate};
pub use request::{is_truthy, GenerationRequest, ValidationError, PASSTHROUGH_FIELDS};

use crate::config::GenerationDefaults;
use crate::transport::RuntimeClient;
use crate::warmup::WarmupScheduler;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct RelayState {
    pub client: RuntimeClient,
    pub defaults: Arc<GenerationDefaults>,
    pub warmup: Arc<WarmupScheduler>,
    pub static_dir: Arc<PathBuf>,
}

impl RelayState {
    pub fn new(
        client: RuntimeClient,
        defaults: GenerationDefaults,
        warmup: Arc<WarmupScheduler>,
        static_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            defaults: Arc::new(defaults),
            warmup,
            static_dir: Arc::new(static_dir.into()),
        }
    }
}
