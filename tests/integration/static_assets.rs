//! Integration tests for the front-end routes

use crate::integration::mock_server::{body_bytes, RelayFixture};
use axum::http::StatusCode;

#[tokio::test]
async fn test_index_served_from_static_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>relay</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1);").unwrap();

    let relay = RelayFixture::unreachable(dir.path());

    let resp = relay.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(body_bytes(resp).await, b"<h1>relay</h1>".to_vec());

    let resp = relay.get("/static/app.js").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"console.log(1);".to_vec());
}

#[tokio::test]
async fn test_missing_index_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let relay = RelayFixture::unreachable(dir.path());

    let resp = relay.get("/").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "index.html not found");
}
