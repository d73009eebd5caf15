//! One-shot, best-effort model warm-up.
//!
//! The first call to [`WarmupScheduler::schedule`] spawns a single detached
//! task that asks the runtime to load every discovered model. Every later call,
//! from any thread, is a no-op. Failures are logged per model and never reach
//! request handling.

use crate::discovery::ModelDiscovery;
use crate::transport::RuntimeClient;
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Something that can load a model into runtime memory.
#[async_trait]
pub trait ModelWarmer: Send + Sync {
    async fn warm(&self, model: &str) -> Result<()>;
}

/// Warms models through the runtime's generate endpoint.
pub struct RuntimeWarmer {
    client: RuntimeClient,
    keep_alive: String,
}

impl RuntimeWarmer {
    pub fn new(client: RuntimeClient, keep_alive: impl Into<String>) -> Self {
        Self {
            client,
            keep_alive: keep_alive.into(),
        }
    }
}

#[async_trait]
impl ModelWarmer for RuntimeWarmer {
    async fn warm(&self, model: &str) -> Result<()> {
        self.client.warm(model, &self.keep_alive).await
    }
}

/// Outcome of one warm-up pass.
#[derive(Debug, Clone, Default)]
pub struct WarmupReport {
    pub warmed: Vec<String>,
    /// `(model, error message)` pairs.
    pub failed: Vec<(String, String)>,
    pub elapsed: Duration,
}

pub struct WarmupScheduler {
    scheduled: AtomicBool,
    discovery: ModelDiscovery,
    warmer: Arc<dyn ModelWarmer>,
}

impl WarmupScheduler {
    pub fn new(discovery: ModelDiscovery, warmer: Arc<dyn ModelWarmer>) -> Self {
        Self {
            scheduled: AtomicBool::new(false),
            discovery,
            warmer,
        }
    }

    /// Start the warm-up pass unless it has already been started.
    ///
    /// Returns `true` only for the call that started it. Must be called from
    /// within a tokio runtime.
    pub fn schedule(&self) -> bool {
        if self
            .scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let discovery = self.discovery.clone();
        let warmer = Arc::clone(&self.warmer);
        tokio::spawn(async move {
            warm_up_models(&discovery, warmer.as_ref()).await;
        });
        true
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }
}

/// Warm every discovered model in turn; one failure does not stop the rest.
pub async fn warm_up_models(discovery: &ModelDiscovery, warmer: &dyn ModelWarmer) -> WarmupReport {
    let start = Instant::now();
    let mut report = WarmupReport::default();

    for model in discovery.discover() {
        info!(model = %model, "Warming up model");
        match warmer.warm(&model).await {
            Ok(()) => {
                info!(model = %model, "Model warmed");
                report.warmed.push(model);
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Warm-up failed");
                report.failed.push((model, e.to_string()));
            }
        }
    }

    report.elapsed = start.elapsed();
    info!(
        warmed = report.warmed.len(),
        failed = report.failed.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Warm-up pass finished"
    );
    report
}
