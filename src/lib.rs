//! oxfetch - 缓存优先的数据拉取客户端
//!
//! 立即返回缓存快照，同时在后台刷新；内容摘要不变时不重复写入存储，
//! 网络失败时退回旧数据。另提供延迟覆盖解析器，
//! 在后台刷新完成后把服务端数据应用到已经返回的数据图上。

#![doc(html_root_url = "https://docs.rs/oxfetch/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod hasher;
pub mod manager;
pub mod metrics;
pub mod overlay;
pub mod telemetry;
pub mod transport;
pub mod utils;

// Re-export commonly used items
pub use backend::{KvStore, KvStoreExt, MemoryStore, RedisStore};
pub use client::{FetchResult, Fetcher, GroupedFetch, ServerRefresh};
pub use config::Config;
pub use error::{FetchError, Result};
pub use manager::{get_fetcher, FetcherManager};
pub use overlay::{DataGraph, DataManager, Loaded, Path};
pub use transport::{HttpTransport, Transport, TransportResponse};

/// oxfetch 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
