//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 拉取流程测试：缓存命中、后台刷新、摘要去重写入

use async_trait::async_trait;
use oxfetch::backend::{GetType, KvStore, KvStoreExt, MemoryStore, PutOptions};
use oxfetch::error::{FetchError, Result};
use oxfetch::hasher;
use oxfetch::metrics::GLOBAL_METRICS;
use oxfetch::utils::generate_unique_name;
use oxfetch::Fetcher;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[path = "../common/mod.rs"]
mod common;

use common::{memory_fetcher, setup_logging, FailingReadStore, FailingWriteStore, MockTransport};

const URL: &str = "https://api.example.com/v1/profile";

/// 测试内容不变时只写入一次
#[tokio::test]
async fn test_unchanged_content_writes_once() {
    setup_logging();
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"name": "Ada", "age": 36}));
    let (fetcher, store) = memory_fetcher("unchanged", transport.clone());

    let first = fetcher.fetch(URL).await.unwrap();
    assert!(!first.is_cached());
    assert_eq!(first.data, json!({"name": "Ada", "age": 36}));
    assert_eq!(store.write_count(), 1);

    let second = fetcher.fetch(URL).await.unwrap();
    assert!(second.is_cached());
    assert_eq!(second.data, first.data);
    let refreshed = second.server.unwrap().await.unwrap();
    assert_eq!(refreshed, first.data);

    assert_eq!(store.write_count(), 1);
    assert_eq!(transport.calls(), 2);
}

/// 测试缓存命中时立即返回旧数据，后台刷新得到新数据
#[tokio::test]
async fn test_cache_hit_returns_cached_then_fresh() {
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"version": 1}));
    let (fetcher, store) = memory_fetcher("hit", transport.clone());

    fetcher.fetch(URL).await.unwrap();

    transport.set_json(URL, json!({"version": 2}));
    let result = fetcher.fetch(URL).await.unwrap();
    assert_eq!(result.data, json!({"version": 1}));

    let server = result.server.clone().unwrap();
    assert_eq!(server.await.unwrap(), json!({"version": 2}));
    assert_eq!(store.write_count(), 2);

    // 同一个刷新的所有克隆得到相同结果
    assert_eq!(result.resolve().await.unwrap(), json!({"version": 2}));

    let third = fetcher.fetch(URL).await.unwrap();
    assert_eq!(third.data, json!({"version": 2}));
    third.server.unwrap().await.unwrap();
}

#[derive(Debug, Deserialize, PartialEq)]
struct Profile {
    name: String,
    age: u32,
}

/// 测试按类型解码数据
#[tokio::test]
async fn test_typed_decode() {
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"name": "Ada", "age": 36}));
    let (fetcher, _store) = memory_fetcher("typed", transport);

    let result = fetcher.fetch(URL).await.unwrap();
    let profile: Profile = result.data_as().unwrap();
    assert_eq!(
        profile,
        Profile {
            name: "Ada".to_string(),
            age: 36
        }
    );

    let err = result.data_as::<Vec<u32>>().unwrap_err();
    assert!(matches!(err, FetchError::Serialization(_)));
}

/// 测试存储键为资源标识的摘要，缓存条目带有内容摘要
#[tokio::test]
async fn test_store_layout() {
    let transport = MockTransport::new();
    let payload = json!({"items": [1, 2, 3]});
    transport.set_json(URL, payload.clone());
    let (fetcher, store) = memory_fetcher("layout", transport);

    fetcher.fetch(URL).await.unwrap();

    let key = hasher::digest_str(URL);
    assert_eq!(fetcher.store_key(URL), key);
    let stored = store.get_json(&key).await.unwrap().unwrap();
    assert_eq!(stored["items"], json!([1, 2, 3]));
    assert_eq!(stored["hash"], json!(hasher::digest_json(&payload)));
}

/// 测试键前缀
#[tokio::test]
async fn test_key_prefix() {
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"a": 1}));
    let store = Arc::new(MemoryStore::default());
    let fetcher = Fetcher::builder()
        .store(store.clone())
        .transport(transport)
        .key_prefix("svc:")
        .build()
        .unwrap();

    fetcher.fetch(URL).await.unwrap();
    let key = format!("svc:{}", hasher::digest_str(URL));
    assert!(store.get(&key, GetType::Text).await.unwrap().is_some());
}

/// 测试非对象数据的缓存
#[tokio::test]
async fn test_non_object_payloads() {
    let transport = MockTransport::new();
    let (fetcher, store) = memory_fetcher("scalars", transport.clone());

    for (i, payload) in [json!([1, "two", null]), json!("text"), json!(42), json!({"hash": "mine"})]
        .into_iter()
        .enumerate()
    {
        let url = format!("{}/{}", URL, i);
        transport.set_json(&url, payload.clone());

        let miss = fetcher.fetch(&url).await.unwrap();
        assert_eq!(miss.data, payload);

        let hit = fetcher.fetch(&url).await.unwrap();
        assert!(hit.is_cached(), "payload {} should be cached", payload);
        assert_eq!(hit.data, payload);
        hit.server.unwrap().await.unwrap();
    }
    assert_eq!(store.write_count(), 4);
}

/// 测试格式错误的缓存条目导致错误，而不是被当作未命中
#[tokio::test]
async fn test_malformed_entry_is_fatal() {
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"ok": true}));
    let (fetcher, store) = memory_fetcher("malformed", transport);

    store
        .put(&fetcher.store_key(URL), "{not json".to_string(), PutOptions::default())
        .await
        .unwrap();

    let err = fetcher.fetch(URL).await.unwrap_err();
    assert!(matches!(err, FetchError::Serialization(_)), "got {:?}", err);
}

/// 测试存储读取失败会传播
#[tokio::test]
async fn test_store_read_failure_is_fatal() {
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"ok": true}));
    let store = Arc::new(FailingReadStore);
    let fetcher = Fetcher::new(store.clone(), transport);

    let err = fetcher.fetch(URL).await.unwrap_err();
    assert!(matches!(err, FetchError::StoreError(_)));

    let err = store.delete("any").await.unwrap_err();
    assert!(matches!(err, FetchError::NotSupported(_)));
}

/// 测试写入失败不影响返回值
#[tokio::test]
async fn test_write_failure_is_masked() {
    let service = generate_unique_name("write_fail");
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"fresh": true}));
    let store = Arc::new(FailingWriteStore::default());
    let fetcher = Fetcher::builder()
        .name(&service)
        .store(store.clone())
        .transport(transport)
        .build()
        .unwrap();

    let result = fetcher.fetch(URL).await.unwrap();
    assert_eq!(result.data, json!({"fresh": true}));
    assert_eq!(
        store.attempts.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        GLOBAL_METRICS.request_count(&service, "store", "write", "error"),
        1
    );
}

/// 记录写入选项的存储
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    options: Mutex<Vec<PutOptions>>,
}

#[async_trait]
impl KvStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_raw(key).await
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<()> {
        self.options.lock().unwrap().push(options);
        self.inner.put(key, value, options).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// 测试写入时携带配置的过期提示
#[tokio::test]
async fn test_ttl_is_passed_to_store() {
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"a": 1}));
    let store = Arc::new(RecordingStore::default());
    let fetcher = Fetcher::builder()
        .store(store.clone())
        .transport(transport)
        .ttl(90)
        .build()
        .unwrap();

    fetcher.fetch(URL).await.unwrap();
    let options = store.options.lock().unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].expiration_ttl, Some(90));
}

/// 测试默认TTL为一年
#[test]
fn test_default_ttl() {
    let fetcher = Fetcher::new(Arc::new(MemoryStore::default()), MockTransport::new());
    assert_eq!(fetcher.ttl(), 31_536_000);
    assert!(Fetcher::builder()
        .store(Arc::new(MemoryStore::default()))
        .transport(MockTransport::new())
        .ttl(0)
        .build()
        .is_err());
}

/// 测试命中与未命中指标
#[tokio::test]
async fn test_fetch_metrics() {
    let service = generate_unique_name("metrics");
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"m": 1}));
    let (fetcher, _store) = memory_fetcher(&service, transport);

    fetcher.fetch(URL).await.unwrap();
    fetcher.fetch(URL).await.unwrap().resolve().await.unwrap();

    assert_eq!(GLOBAL_METRICS.request_count(&service, "store", "fetch", "miss"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&service, "store", "fetch", "hit"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&service, "store", "write", "skip"), 1);
    assert_eq!(
        GLOBAL_METRICS.request_count(&service, "network", "refresh", "success"),
        2
    );
}
