//! HTTP surface of the relay.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | `index.html` from the static directory |
//! | `GET /static/*` | files under the static directory |
//! | `POST /api/generate` | [`handle_generate`] |
//!
//! Every request passes through a middleware that triggers the warm-up
//! scheduler; only the first trigger in the process does any work.

use crate::config::RelayConfig;
use crate::discovery::ModelDiscovery;
use crate::relay::{handle_generate, RelayState};
use crate::transport::RuntimeClient;
use crate::warmup::{RuntimeWarmer, WarmupScheduler};
use crate::Result;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Build the shared state and router from resolved configuration.
///
/// Returns the scheduler too so the caller can trigger warm-up at startup.
pub fn build_app(config: &RelayConfig) -> Result<(Router, Arc<WarmupScheduler>)> {
    let client = RuntimeClient::new(config.generate_url()?)?;
    let warmer = RuntimeWarmer::new(client.clone(), config.defaults.keep_alive.clone());
    let scheduler = Arc::new(WarmupScheduler::new(
        ModelDiscovery::from_config(config),
        Arc::new(warmer),
    ));

    let state = RelayState::new(
        client,
        config.defaults.clone(),
        Arc::clone(&scheduler),
        config.static_dir.clone(),
    );
    Ok((router(state), scheduler))
}

pub fn router(state: RelayState) -> Router {
    let static_files = ServeDir::new(state.static_dir.as_path());

    Router::new()
        .route("/", get(index))
        .route("/api/generate", post(handle_generate))
        .nest_service("/static", static_files)
        .layer(middleware::from_fn_with_state(state.clone(), trigger_warmup))
        .with_state(state)
}

/// Serve until ctrl-c (or SIGTERM on unix), then drain in-flight requests.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn trigger_warmup(State(state): State<RelayState>, req: Request, next: Next) -> Response {
    if state.warmup.schedule() {
        info!("Warm-up scheduled by first request");
    }
    next.run(req).await
}

async fn index(State(state): State<RelayState>) -> Response {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read(&path).await {
        Ok(contents) => Html(contents).into_response(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Front-end asset unavailable");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "index.html not found" })),
            )
                .into_response()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
