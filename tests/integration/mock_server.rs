//! Mock runtime and relay app setup for integration tests

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use mockito::{Matcher, Mock, Server, ServerGuard};
use ollama_relay::relay::RelayState;
use ollama_relay::{server, GenerationDefaults, ModelDiscovery, ModelWarmer, RuntimeClient, WarmupScheduler};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

/// A port nothing listens on.
pub const UNREACHABLE_RUNTIME: &str = "http://127.0.0.1:1/api/generate";

/// Test fixture that stands in for the model runtime
pub struct MockRuntime {
    pub server: ServerGuard,
}

impl MockRuntime {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    pub fn generate_url(&self) -> Url {
        Url::parse(&format!("{}/api/generate", self.server.url())).unwrap()
    }

    /// Stream `lines` as an NDJSON body when the request body matches `matcher`
    pub async fn mock_ndjson_stream(&mut self, matcher: Matcher, lines: &[&str]) -> Mock {
        let body: String = lines.iter().map(|line| format!("{}\n", line)).collect();
        self.server
            .mock("POST", "/api/generate")
            .match_body(matcher)
            .with_status(200)
            .with_header("content-type", "application/x-ndjson")
            .with_body(body)
            .create_async()
            .await
    }

    /// Answer with a fixed JSON body when the request body matches `matcher`
    pub async fn mock_json_response(&mut self, matcher: Matcher, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", "/api/generate")
            .match_body(matcher)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}

/// Counts warm-up calls instead of talking to a runtime
#[derive(Default)]
pub struct CountingWarmer {
    pub calls: AtomicUsize,
}

impl CountingWarmer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelWarmer for CountingWarmer {
    async fn warm(&self, _model: &str) -> ollama_relay::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn defaults() -> GenerationDefaults {
    GenerationDefaults {
        model: "llama3".into(),
        keep_alive: "5m".into(),
        num_predict: 512,
    }
}

/// Everything a test needs to drive the relay router
pub struct RelayFixture {
    pub app: Router,
    pub scheduler: Arc<WarmupScheduler>,
    pub warmer: Arc<CountingWarmer>,
}

impl RelayFixture {
    pub fn new(generate_url: Url, static_dir: &Path) -> Self {
        let client = RuntimeClient::new(generate_url).expect("runtime client");
        let warmer = Arc::new(CountingWarmer::default());
        let discovery = ModelDiscovery::new(static_dir.join("agents.json"), "llama3");
        let scheduler = Arc::new(WarmupScheduler::new(discovery, warmer.clone()));
        let state = RelayState::new(client, defaults(), scheduler.clone(), static_dir);

        Self {
            app: server::router(state),
            scheduler,
            warmer,
        }
    }

    pub fn unreachable(static_dir: &Path) -> Self {
        Self::new(Url::parse(UNREACHABLE_RUNTIME).unwrap(), static_dir)
    }

    pub async fn post_generate(&self, body: impl Into<Body>) -> Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        self.app.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.app.clone().oneshot(req).await.unwrap()
    }
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Parse an NDJSON response body into its chunks
pub async fn body_lines(resp: Response<Body>) -> Vec<Value> {
    let bytes = body_bytes(resp).await;
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.is_empty() || text.ends_with('\n'), "unterminated line in {text:?}");
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
