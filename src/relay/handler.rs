use crate::pipeline::{encode_chunk, relay_chunks, upstream_error_chunk};
use crate::relay::{GenerationRequest, RelayState};
use crate::transport::RuntimeClient;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde_json::json;
use std::convert::Infallible;
use tracing::{error, info};
use uuid::Uuid;

/// `POST /api/generate`.
///
/// The body is read as raw bytes rather than through the `Json` extractor so
/// that a missing content type or unparseable body reports the prompt error
/// instead of a framework rejection.
pub async fn handle_generate(State(state): State<RelayState>, body: Bytes) -> Response {
    let request = match GenerationRequest::from_body(&body, &state.defaults) {
        Ok(request) => request,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
                .into_response()
        }
    };

    relay_generate(&state.client, request).await
}

/// Forward a validated request and build the caller's response.
///
/// Upstream failures never change the status: they arrive as one in-band
/// `{"error": ...}` line with status 200.
pub async fn relay_generate(client: &RuntimeClient, request: GenerationRequest) -> Response {
    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        model = %request.model,
        stream = request.stream,
        "Proxying prompt to runtime"
    );

    let runtime_body = request.to_runtime_body();

    if !request.stream {
        return match client.generate_buffered(&runtime_body).await {
            Ok(bytes) => json_body(Body::from(bytes)),
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Error while talking to runtime");
                json_body(Body::from(encode_chunk(&upstream_error_chunk(&e))))
            }
        };
    }

    match client.generate_stream(&runtime_body).await {
        Ok(upstream) => {
            let lines = relay_chunks(upstream).map(|chunk| Ok::<_, Infallible>(encode_chunk(&chunk)));
            json_body(Body::from_stream(lines))
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Error while talking to runtime");
            json_body(Body::from(encode_chunk(&upstream_error_chunk(&e))))
        }
    }
}

fn json_body(body: Body) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
