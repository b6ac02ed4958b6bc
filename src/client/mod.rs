//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了拉取客户端：先返回缓存快照，同时在后台刷新。
//!
//! 单次 `fetch` 的流程：
//!
//! ```text
//! START -> (读缓存 || 后台刷新) -> 命中: 返回缓存 + 进行中的刷新
//!                              -> 未命中: 等待刷新 -> 新数据 / 旧数据 / 错误
//! ```
//!
//! 刷新失败时若存在缓存条目则返回旧数据，不写回存储；
//! 刷新成功时仅在摘要变化时写入存储，写入失败只记录日志。

pub mod batch;
pub mod entry;
pub mod refresh;

use crate::backend::{GetType, KvStore, MemoryStore, PutOptions, RedisStore};
use crate::config::{GlobalConfig, ServiceConfig, StoreBackend, DEFAULT_TTL_SECS};
use crate::error::{FetchError, Result};
use crate::hasher;
use crate::metrics::GLOBAL_METRICS;
use crate::transport::{HttpTransport, Transport};
use crate::utils::redaction::{redact_url, RedactedUrl};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

pub use batch::GroupedFetch;
pub use entry::CacheEntry;
pub use refresh::ServerRefresh;

/// 单次拉取的结果
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// 立即可用的数据：缓存命中时为缓存数据，否则为网络数据
    pub data: Value,
    /// 缓存命中时进行中的后台刷新；未命中时为None
    pub server: Option<ServerRefresh>,
}

impl FetchResult {
    /// 数据是否来自缓存
    pub fn is_cached(&self) -> bool {
        self.server.is_some()
    }

    /// 将数据反序列化为指定类型
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    pub fn into_parts(self) -> (Value, Option<ServerRefresh>) {
        (self.data, self.server)
    }

    /// 返回最新的数据：有后台刷新则等待它，否则直接返回数据
    pub async fn resolve(self) -> Result<Value> {
        match self.server {
            Some(server) => server.await,
            None => Ok(self.data),
        }
    }
}

/// 拉取客户端
///
/// 只持有存储和传输层的引用，所有缓存状态都在存储中
#[derive(Clone)]
pub struct Fetcher {
    /// 服务名称
    name: String,
    store: Arc<dyn KvStore>,
    transport: Arc<dyn Transport>,
    /// 写入时传给存储的过期提示（秒）
    ttl: u64,
    key_prefix: String,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("name", &self.name)
            .field("store", &self.store.name())
            .field("ttl", &self.ttl)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

/// 拉取客户端构建器
#[derive(Default)]
pub struct FetcherBuilder {
    name: Option<String>,
    store: Option<Arc<dyn KvStore>>,
    transport: Option<Arc<dyn Transport>>,
    ttl: Option<u64>,
    key_prefix: String,
}

impl FetcherBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Fetcher> {
        let store = self
            .store
            .ok_or_else(|| FetchError::ConfigError("Fetcher requires a store".to_string()))?;
        let transport = self
            .transport
            .ok_or_else(|| FetchError::ConfigError("Fetcher requires a transport".to_string()))?;
        let ttl = self.ttl.unwrap_or(DEFAULT_TTL_SECS);
        if ttl == 0 {
            return Err(FetchError::ConfigError("ttl cannot be zero".to_string()));
        }
        Ok(Fetcher {
            name: self.name.unwrap_or_else(|| "default".to_string()),
            store,
            transport,
            ttl,
            key_prefix: self.key_prefix,
        })
    }
}

impl Fetcher {
    /// 使用默认设置创建拉取客户端
    pub fn new(store: Arc<dyn KvStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: "default".to_string(),
            store,
            transport,
            ttl: DEFAULT_TTL_SECS,
            key_prefix: String::new(),
        }
    }

    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// 根据服务配置创建拉取客户端
    ///
    /// # 参数
    ///
    /// * `name` - 服务名称
    /// * `global` - 全局配置
    /// * `service` - 服务配置
    #[instrument(skip(global, service), level = "info", name = "init_fetcher")]
    pub async fn from_config(
        name: &str,
        global: &GlobalConfig,
        service: &ServiceConfig,
    ) -> Result<Self> {
        let store: Arc<dyn KvStore> = match service.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::from_config(&service.store)),
            StoreBackend::Redis => Arc::new(RedisStore::connect(&service.store).await?),
        };
        let transport = Arc::new(HttpTransport::new(
            service.effective_timeout_ms(global),
            &global.user_agent,
        )?);
        info!(
            "Fetcher {} initialized with {} store",
            name,
            store.name()
        );
        Self::builder()
            .name(name)
            .store(store)
            .transport(transport)
            .ttl(service.effective_ttl(global))
            .key_prefix(service.key_prefix.clone())
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// 由资源标识派生存储键
    pub fn store_key(&self, resource_id: &str) -> String {
        hasher::store_key(&self.key_prefix, resource_id)
    }

    /// 拉取资源
    ///
    /// 先启动后台刷新，再读取缓存，两者并发进行。缓存命中时立即返回缓存数据
    /// 和进行中的刷新；未命中时等待刷新结果。
    ///
    /// 缓存中的值无法解析为JSON时返回错误，不会被当作未命中。
    #[instrument(skip(self, resource_id), level = "debug", fields(service = %self.name, url = %RedactedUrl(resource_id)))]
    pub async fn fetch(&self, resource_id: &str) -> Result<FetchResult> {
        let key = self.store_key(resource_id);
        let server = self.spawn_refresh(resource_id);

        match self.read_entry(&key).await? {
            Some(entry) => {
                GLOBAL_METRICS.record_request(&self.name, "store", "fetch", "hit");
                debug!("cache hit, returning cached data with pending refresh");
                Ok(FetchResult {
                    data: entry.payload,
                    server: Some(server),
                })
            }
            None => {
                GLOBAL_METRICS.record_request(&self.name, "store", "fetch", "miss");
                debug!("cache miss, waiting for network");
                let data = server.await?;
                Ok(FetchResult { data, server: None })
            }
        }
    }

    /// 在后台启动刷新任务
    ///
    /// 任务一旦启动就会执行到结束，丢弃返回的句柄不会取消它
    pub fn spawn_refresh(&self, resource_id: &str) -> ServerRefresh {
        let fetcher = self.clone();
        let resource_id = resource_id.to_string();
        ServerRefresh::spawn(async move { fetcher.refresh(&resource_id).await })
    }

    /// 从网络刷新资源
    ///
    /// 网络失败时：存在缓存条目则返回缓存数据，否则返回错误。
    /// 网络成功时：摘要与缓存不同才写入存储，写入失败不影响返回值。
    #[instrument(skip(self, resource_id), level = "debug", fields(service = %self.name, url = %RedactedUrl(resource_id)))]
    pub async fn refresh(&self, resource_id: &str) -> Result<Value> {
        let key = self.store_key(resource_id);
        let cached = self.read_entry(&key).await?;

        let start = Instant::now();
        let fresh = self.fetch_remote(resource_id).await;
        GLOBAL_METRICS.record_duration(
            &self.name,
            "network",
            "refresh",
            start.elapsed().as_secs_f64(),
        );

        let payload = match fresh {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Fetching error for {}: {}", RedactedUrl(resource_id), e);
                return match cached {
                    Some(entry) => {
                        GLOBAL_METRICS.record_request(&self.name, "network", "refresh", "stale");
                        Ok(entry.payload)
                    }
                    None => {
                        GLOBAL_METRICS.record_request(&self.name, "network", "refresh", "error");
                        Err(e)
                    }
                };
            }
        };
        GLOBAL_METRICS.record_request(&self.name, "network", "refresh", "success");

        self.write_if_changed(&key, &payload, cached.as_ref()).await;
        Ok(payload)
    }

    /// 读取并还原缓存条目
    async fn read_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let value = self.store.get(key, GetType::Json).await?;
        Ok(value.and_then(|v| CacheEntry::from_value(v.into_json())))
    }

    /// 请求网络并解析响应
    async fn fetch_remote(&self, resource_id: &str) -> Result<Value> {
        let response = self.transport.get(resource_id).await?;
        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status,
                url: redact_url(resource_id),
            });
        }
        response.json()
    }

    /// 内容变化时写入存储
    ///
    /// 写入失败只记录日志和指标，不向调用方传播
    async fn write_if_changed(&self, key: &str, payload: &Value, cached: Option<&CacheEntry>) {
        let hash = hasher::digest_json(payload);
        if cached.and_then(|e| e.hash.as_deref()) == Some(hash.as_str()) {
            GLOBAL_METRICS.record_request(&self.name, "store", "write", "skip");
            debug!("content unchanged, skipping store write");
            return;
        }

        let entry = CacheEntry::new(payload.clone(), hash);
        let result = match entry.to_store_string() {
            Ok(serialized) => {
                let start = Instant::now();
                let res = self
                    .store
                    .put(key, serialized, PutOptions::with_ttl(self.ttl))
                    .await;
                GLOBAL_METRICS.record_duration(
                    &self.name,
                    "store",
                    "write",
                    start.elapsed().as_secs_f64(),
                );
                res
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                GLOBAL_METRICS.record_request(&self.name, "store", "write", "success");
                debug!("store updated for key {}", key);
            }
            Err(e) => {
                GLOBAL_METRICS.record_request(&self.name, "store", "write", "error");
                error!("Error during caching logic for key {}: {}", key, e);
            }
        }
    }
}
