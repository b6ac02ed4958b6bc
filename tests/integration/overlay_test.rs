//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 延迟覆盖解析测试

use oxfetch::overlay::{DataGraph, DataManager, Slot};
use oxfetch::ServerRefresh;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[path = "../common/mod.rs"]
mod common;

use common::{memory_fetcher, setup_logging, MockTransport};

/// 测试待定的服务端数据完成后调用 setter
#[tokio::test]
async fn test_pending_section_resolves_into_setter() {
    setup_logging();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let refresh = ServerRefresh::spawn(async move {
        let _ = release_rx.await;
        Ok(json!({"name": "X"}))
    });

    let mut graph = DataGraph::from_value(json!({"user": {"name": "cached"}})).unwrap();
    graph.insert_pending("user", refresh);
    let manager = DataManager::with_graph(graph);

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let counter = calls.clone();
    let loaded = manager.load("user.name", move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(v);
    });

    assert_eq!(*loaded, Some(json!("cached")));
    assert!(loaded.is_deferred());
    assert!(manager.is_pending("user"));
    assert_eq!(manager.resolve("server.user.name"), None);

    // 刷新完成后先写回数据图，setter 仍等待放行
    release_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.is_pending("user") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("refresh was not written back");
    assert_eq!(manager.resolve("server.user.name"), Some(json!("X")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    loaded.release().unwrap().await.unwrap();

    assert_eq!(rx.recv().await, Some(json!("X")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.resolve("user.name"), Some(json!("cached")));
}

/// 测试没有服务端分区时不调用 setter
#[tokio::test]
async fn test_no_server_section_never_calls_setter() {
    let manager = DataManager::with_graph(
        DataGraph::from_value(json!({"user": {"name": "a"}, "server": {"other": {}}})).unwrap(),
    );
    let loaded = manager.load("user.name", |_| panic!("setter must not run"));
    assert_eq!(*loaded, Some(json!("a")));
    assert!(loaded.release().is_none());

    let loaded = manager.load("missing.path", |_| panic!("setter must not run"));
    assert_eq!(loaded.into_value(), None);
}

/// 测试服务端分区存在但路径下没有值
#[tokio::test]
async fn test_missing_server_path_skips_setter() {
    let mut graph = DataGraph::new();
    graph.insert("user", json!({"name": "a"}));
    graph.insert_server("user", json!({"email": "a@example.com"}));
    let manager = DataManager::with_graph(graph);

    let (tx, rx) = oneshot::channel::<Value>();
    let handle = manager
        .load("user.name", move |v| {
            let _ = tx.send(v);
        })
        .release();
    handle.unwrap().await.unwrap();
    assert!(rx.await.is_err());
}

/// 测试多个订阅共享同一个后台刷新
#[tokio::test]
async fn test_multiple_loads_share_refresh() {
    let mut graph = DataGraph::new();
    graph.insert_pending(
        "profile",
        ServerRefresh::spawn(async { Ok(json!({"name": "N", "age": 3})) }),
    );
    let manager = DataManager::with_graph(graph);

    let (name_tx, name_rx) = oneshot::channel();
    let (age_tx, age_rx) = oneshot::channel();
    let h1 = manager
        .load("profile.name", move |v| {
            let _ = name_tx.send(v);
        })
        .release();
    let h2 = manager
        .load("profile.age", move |v| {
            let _ = age_tx.send(v);
        })
        .release();
    h1.unwrap().await.unwrap();
    h2.unwrap().await.unwrap();

    assert_eq!(name_rx.await.unwrap(), json!("N"));
    assert_eq!(age_rx.await.unwrap(), json!(3));
}

/// 测试分区解析后再次加载直接使用缓存结果，不再等待原刷新
#[tokio::test]
async fn test_second_load_uses_resolved_section() {
    let spawned = Arc::new(AtomicUsize::new(0));
    let counter = spawned.clone();
    let refresh = ServerRefresh::spawn(async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"name": "fresh"}))
    });

    let mut graph = DataGraph::new();
    graph.insert("user", json!({"name": "cached"}));
    graph.insert_pending("user", refresh);
    let manager = DataManager::with_graph(graph);

    let (tx, rx) = oneshot::channel();
    manager
        .load("user.name", move |v| {
            let _ = tx.send(v);
        })
        .release()
        .unwrap()
        .await
        .unwrap();
    assert_eq!(rx.await.unwrap(), json!("fresh"));

    let snapshot = manager.snapshot();
    assert!(matches!(
        snapshot.server_slot("user"),
        Some(Slot::Resolved(v)) if v == &json!({"name": "fresh"})
    ));

    let (tx, rx) = oneshot::channel();
    let loaded = manager.load("user.name", move |v| {
        let _ = tx.send(v);
    });
    assert_eq!(*loaded, Some(json!("cached")));
    loaded.release().unwrap().await.unwrap();

    assert_eq!(rx.await.unwrap(), json!("fresh"));
    assert_eq!(spawned.load(Ordering::SeqCst), 1);
}

/// 测试多线程运行时下 setter 总在 load 返回之后执行
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_setter_runs_after_load_returns_on_multi_thread() {
    let graph = DataGraph::from_value(json!({
        "user": {"name": "cached"},
        "server": {"user": {"name": "fresh"}}
    }))
    .unwrap();
    let manager = DataManager::with_graph(graph);

    let violations = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..2_000 {
        let returned = Arc::new(AtomicBool::new(false));
        let seen = returned.clone();
        let counter = violations.clone();
        let loaded = manager.load("user.name", move |v| {
            if !seen.load(Ordering::SeqCst) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            assert_eq!(v, json!("fresh"));
        });
        returned.store(true, Ordering::SeqCst);
        handles.push(loaded.release().unwrap());
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(violations.load(Ordering::SeqCst), 0);
}

/// 测试批量拉取结果直接驱动数据图
#[tokio::test]
async fn test_grouped_fetch_into_overlay() {
    const URL: &str = "https://api.example.com/me";
    let transport = MockTransport::new();
    transport.set_json(URL, json!({"name": "before"}));
    let (fetcher, _store) = memory_fetcher("overlay_fetch", transport.clone());
    fetcher.fetch(URL).await.unwrap();

    transport.set_json(URL, json!({"name": "after"}));
    let grouped = fetcher.fetch_and_group([("me", URL)]).await.unwrap();
    let manager = DataManager::with_graph(grouped.into_graph());

    let (tx, rx) = oneshot::channel();
    let loaded = manager.load("me.name", move |v| {
        let _ = tx.send(v);
    });
    assert_eq!(*loaded, Some(json!("before")));
    loaded.release().unwrap().await.unwrap();
    assert_eq!(rx.await.unwrap(), json!("after"));
    assert_eq!(
        manager.snapshot().to_value(),
        json!({"me": {"name": "before"}, "server": {"me": {"name": "after"}}})
    );
}
