//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! HTTP传输测试：通过模拟服务器走完整的拉取流程

use oxfetch::backend::MemoryStore;
use oxfetch::error::FetchError;
use oxfetch::transport::{HttpTransport, Transport};
use oxfetch::Fetcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "../common/mod.rs"]
mod common;

fn create_fetcher(timeout_ms: u64) -> (Fetcher, Arc<MemoryStore>) {
    common::setup_logging();
    let store = Arc::new(MemoryStore::default());
    let transport = HttpTransport::new(timeout_ms, "oxfetch-test").expect("failed to create transport");
    let fetcher = Fetcher::builder()
        .name("http")
        .store(store.clone())
        .transport(Arc::new(transport))
        .build()
        .expect("failed to build fetcher");
    (fetcher, store)
}

#[tokio::test]
async fn test_transport_sends_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config"))
        .and(header("accept", "application/json"))
        .and(header("user-agent", "oxfetch-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"theme": "dark"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new(1000, "oxfetch-test").unwrap();
    let response = transport
        .get(&format!("{}/config", mock_server.uri()))
        .await
        .expect("request failed");

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap(), json!({"theme": "dark"}));
}

#[tokio::test]
async fn test_fetch_over_http_dedups_writes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2]})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (fetcher, store) = create_fetcher(1000);
    let url = format!("{}/items", mock_server.uri());

    let first = fetcher.fetch(&url).await.expect("first fetch failed");
    assert!(!first.is_cached());

    let second = fetcher.fetch(&url).await.expect("second fetch failed");
    assert!(second.is_cached());
    assert_eq!(second.resolve().await.unwrap(), json!({"items": [1, 2]}));

    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_fetch_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (fetcher, _store) = create_fetcher(1000);
    let result = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(FetchError::HttpStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_timeout_falls_back_to_stale() {
    let mock_server = MockServer::start().await;
    let url = format!("{}/slow", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 1})))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"v": 2}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let (fetcher, _store) = create_fetcher(100);
    fetcher.fetch(&url).await.expect("seed fetch failed");

    let result = fetcher.fetch(&url).await.expect("cached fetch failed");
    assert_eq!(result.data, json!({"v": 1}));
    assert_eq!(result.resolve().await.unwrap(), json!({"v": 1}));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let (fetcher, _store) = create_fetcher(500);
    // 端口 9 (discard) 通常没有监听
    let err = fetcher.fetch("http://127.0.0.1:9/none").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "got {:?}", err);
}
