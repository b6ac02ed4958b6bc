//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于内存的键值存储实现，适用于开发环境和测试。

use super::{KvStore, PutOptions};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::utils::{validate_key_length, validate_value_size};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 内存键值存储
///
/// 使用Moka作为底层缓存库。写入时若带有过期提示，会记录过期时间点，
/// 读取到已过期的条目时将其移除并视为不存在。
#[derive(Clone)]
pub struct MemoryStore {
    // 值: (数据, 过期时间)
    cache: Cache<String, (String, Option<Instant>)>,
    max_key_length: usize,
    max_value_size: usize,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    /// 创建新的内存存储
    ///
    /// # 参数
    ///
    /// * `capacity` - 最大条目数
    pub fn new(capacity: u64) -> Self {
        let defaults = StoreConfig::default();
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            max_key_length: defaults.max_key_length,
            max_value_size: defaults.max_value_size,
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 根据存储配置创建
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            cache: Cache::builder().max_capacity(config.max_capacity).build(),
            max_key_length: config.max_key_length,
            max_value_size: config.max_value_size,
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 成功写入的次数
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default().max_capacity)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        match self.cache.get(key).await {
            Some((value, expire_at)) => {
                if let Some(expire_time) = expire_at {
                    if Instant::now() >= expire_time {
                        self.cache.remove(key).await;
                        debug!("memory get: key={}, expired=true, removed", key);
                        return Ok(None);
                    }
                }
                debug!("memory get: key={}, found=true", key);
                Ok(Some(value))
            }
            None => {
                debug!("memory get: key={}, found=false", key);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<()> {
        validate_key_length(key, self.max_key_length)?;
        validate_value_size(value.as_bytes(), self.max_value_size)?;

        let expire_at = options
            .expiration_ttl
            .filter(|ttl| *ttl > 0)
            .and_then(|ttl| Instant::now().checked_add(Duration::from_secs(ttl)));
        self.cache.insert(key.to_string(), (value, expire_at)).await;
        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!("memory put: key={}, ttl={:?}", key, options.expiration_ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.remove(key).await;
        Ok(())
    }
}
