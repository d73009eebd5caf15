//! Integration tests for `POST /api/generate`

use crate::integration::mock_server::{body_bytes, body_lines, MockRuntime, RelayFixture};
use axum::http::StatusCode;
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn test_non_streaming_body_is_forwarded_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = MockRuntime::new().await;
    let mock = runtime
        .mock_json_response(
            Matcher::PartialJson(json!({"prompt": "hello", "stream": false})),
            200,
            r#"{"response": "hi"}"#,
        )
        .await;

    let relay = RelayFixture::new(runtime.generate_url(), dir.path());
    let resp = relay
        .post_generate(json!({"prompt": "hello", "stream": false}).to_string())
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    assert_eq!(body_bytes(resp).await, br#"{"response": "hi"}"#.to_vec());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_streaming_relays_in_order_and_closes_after_done() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = MockRuntime::new().await;
    let mock = runtime
        .mock_ndjson_stream(
            Matcher::Json(json!({
                "prompt": "hello",
                "model": "llama3",
                "keep_alive": "5m",
                "num_predict": 512,
                "stream": true
            })),
            &[
                r#"{"model":"llama3","response":"Hel","done":false}"#,
                "",
                r#"{"model":"llama3","response":"lo","done":false}"#,
                r#"{"model":"llama3","response":"","done":true,"eval_count":2}"#,
                r#"{"model":"llama3","response":"ignored"}"#,
            ],
        )
        .await;

    let relay = RelayFixture::new(runtime.generate_url(), dir.path());
    let resp = relay.post_generate(json!({"prompt": "  hello "}).to_string()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let chunks = body_lines(resp).await;
    assert_eq!(
        chunks,
        vec![
            json!({"model": "llama3", "response": "Hel", "done": false}),
            json!({"model": "llama3", "response": "lo", "done": false}),
            json!({"model": "llama3", "response": "", "done": true, "eval_count": 2}),
        ]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_line_is_reported_in_band() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = MockRuntime::new().await;
    let _mock = runtime
        .mock_ndjson_stream(
            Matcher::Any,
            &[
                r#"{"response":"a","done":false}"#,
                r#"{"response": tru"#,
                r#"{"response":"b","done":true}"#,
            ],
        )
        .await;

    let relay = RelayFixture::new(runtime.generate_url(), dir.path());
    let chunks = body_lines(relay.post_generate(json!({"prompt": "p"}).to_string()).await).await;

    assert_eq!(chunks.len(), 3);
    assert_eq!(
        chunks[1],
        json!({"error": "invalid json from ollama", "raw": "{\"response\": tru"})
    );
    assert_eq!(chunks[2], json!({"response": "b", "done": true}));
}

#[tokio::test]
async fn test_non_positive_num_predict_uses_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = MockRuntime::new().await;
    let mock = runtime
        .server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"num_predict": 512})))
        .with_status(200)
        .with_body(r#"{"response":"ok","done":true}"#)
        .expect(2)
        .create_async()
        .await;

    let relay = RelayFixture::new(runtime.generate_url(), dir.path());
    for payload in [
        json!({"prompt": "p", "stream": false, "num_predict": -3}),
        json!({"prompt": "p", "stream": false}),
    ] {
        let resp = relay.post_generate(payload.to_string()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_passthrough_fields_forwarded_only_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = MockRuntime::new().await;
    let mock = runtime
        .mock_json_response(
            Matcher::Json(json!({
                "prompt": "p",
                "model": "mistral",
                "keep_alive": "1h",
                "num_predict": 16,
                "stream": false,
                "options": {"temperature": 0.1},
                "format": "json"
            })),
            200,
            "{}",
        )
        .await;

    let relay = RelayFixture::new(runtime.generate_url(), dir.path());
    let resp = relay
        .post_generate(
            json!({
                "prompt": "p",
                "model": "mistral",
                "keep_alive": "1h",
                "num_predict": "16",
                "stream": false,
                "options": {"temperature": 0.1},
                "format": "json",
                "unknown": "dropped"
            })
            .to_string(),
        )
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"{}".to_vec());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_validation_errors_are_400_without_upstream_call() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = MockRuntime::new().await;
    let mock = runtime
        .server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body("{}")
        .expect(0)
        .create_async()
        .await;

    let relay = RelayFixture::new(runtime.generate_url(), dir.path());
    let cases = [
        (json!({}).to_string(), "prompt is required"),
        (json!({"prompt": "   "}).to_string(), "prompt is required"),
        ("not json".to_string(), "prompt is required"),
        (
            json!({"prompt": "p", "num_predict": "ten"}).to_string(),
            "num_predict must be an integer",
        ),
    ];

    for (payload, message) in cases {
        let resp = relay.post_generate(payload).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body, json!({"error": message}));
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_runtime_yields_single_error_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let relay = RelayFixture::unreachable(dir.path());

    for stream in [true, false] {
        let resp = relay
            .post_generate(json!({"prompt": "p", "stream": stream}).to_string())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let chunks = body_lines(resp).await;
        assert_eq!(chunks.len(), 1);
        let obj = chunks[0].as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj["error"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn test_runtime_error_status_is_reported_in_band() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = MockRuntime::new().await;
    let _mock = runtime
        .mock_json_response(Matcher::Any, 404, r#"{"error":"model 'nope' not found"}"#)
        .await;

    let relay = RelayFixture::new(runtime.generate_url(), dir.path());
    let resp = relay
        .post_generate(json!({"prompt": "p", "model": "nope"}).to_string())
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let chunks = body_lines(resp).await;
    assert_eq!(chunks.len(), 1);
    let message = chunks[0]["error"].as_str().unwrap();
    assert!(message.contains("404"), "unexpected message: {message}");
}
