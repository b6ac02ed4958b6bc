//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的键值存储实现。

use super::{KvStore, PutOptions};
use crate::config::StoreConfig;
use crate::error::{FetchError, Result};
use crate::utils::{validate_key_length, validate_value_size};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use secrecy::ExposeSecret;
use tokio::time::{timeout, Duration};
use tracing::{debug, instrument};

/// Redis键值存储
///
/// 写入使用 `SET key value EX ttl`，过期由Redis执行
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    max_key_length: usize,
    max_value_size: usize,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("max_key_length", &self.max_key_length)
            .field("max_value_size", &self.max_value_size)
            .finish()
    }
}

impl RedisStore {
    /// 连接Redis并创建存储
    ///
    /// # 参数
    ///
    /// * `config` - 存储配置
    ///
    /// # 返回值
    ///
    /// 返回新的RedisStore实例或错误
    #[instrument(skip(config), level = "info", name = "init_redis_store")]
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let connection_string = config.connection_string.expose_secret();
        let client = Client::open(connection_string)?;
        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(FetchError::StoreError(format!(
                    "Connection timed out after {}ms",
                    config.connection_timeout_ms
                )));
            }
        };
        Ok(Self {
            manager,
            max_key_length: config.max_key_length,
            max_value_size: config.max_value_size,
        })
    }

    /// 检查连接是否正常
    #[instrument(skip(self), level = "debug")]
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// 获取条目剩余生存时间（秒）
    #[instrument(skip(self), level = "debug")]
    pub async fn ttl(&self, key: &str) -> Result<Option<u64>> {
        let ttl: i64 = self.manager.clone().ttl(key).await?;
        if ttl > 0 {
            Ok(Some(ttl as u64))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        debug!("redis get: key={}, found={}", key, value.is_some());
        Ok(value)
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<()> {
        validate_key_length(key, self.max_key_length)?;
        validate_value_size(value.as_bytes(), self.max_value_size)?;

        let mut conn = self.manager.clone();
        match options.expiration_ttl.filter(|ttl| *ttl > 0) {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        debug!("redis put: key={}, ttl={:?}", key, options.expiration_ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
