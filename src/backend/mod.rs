//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了键值存储接口及其实现（内存、Redis）。
//!
//! 存储只负责按键保存字符串；过期策略仅作为写入时的提示，
//! 是否执行由具体实现决定。

pub mod memory;
pub mod redis_store;

use crate::error::{FetchError, Result};
use async_trait::async_trait;
use serde_json::Value;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// 读取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GetType {
    /// 原样返回存储的字符串
    #[default]
    Text,
    /// 将存储的字符串解析为 JSON，解析失败视为错误
    Json,
}

/// 读取结果
#[derive(Debug, Clone, PartialEq)]
pub enum KvValue {
    Text(String),
    Json(Value),
}

impl KvValue {
    /// 取出 JSON 值；文本值会被原样包装为 JSON 字符串
    pub fn into_json(self) -> Value {
        match self {
            KvValue::Json(v) => v,
            KvValue::Text(s) => Value::String(s),
        }
    }
}

/// 写入选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// 过期时间提示（秒）
    pub expiration_ttl: Option<u64>,
}

impl PutOptions {
    pub fn with_ttl(ttl: u64) -> Self {
        Self {
            expiration_ttl: Some(ttl),
        }
    }
}

/// 键值存储特征
///
/// 拉取客户端通过该接口读写缓存条目，存储实例以依赖注入的方式提供
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 存储名称，用于日志和指标
    fn name(&self) -> &str;

    /// 读取原始字符串
    ///
    /// # 参数
    ///
    /// * `key` - 存储键
    ///
    /// # 返回值
    ///
    /// 返回存储的字符串，不存在或已过期时返回None
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// 写入字符串
    ///
    /// # 参数
    ///
    /// * `key` - 存储键
    /// * `value` - 字符串值
    /// * `options` - 写入选项（过期提示）
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<()>;

    /// 删除条目
    ///
    /// 只读存储可以不实现，默认返回 `FetchError::NotSupported`
    async fn delete(&self, key: &str) -> Result<()> {
        Err(FetchError::NotSupported(format!(
            "{} store does not support delete (key {})",
            self.name(),
            key
        )))
    }

    /// 按模式读取
    ///
    /// `GetType::Json` 下，存储的字符串不是合法 JSON 时返回
    /// `FetchError::Serialization`，不会被当作未命中。
    async fn get(&self, key: &str, get_type: GetType) -> Result<Option<KvValue>> {
        let raw = match self.get_raw(key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match get_type {
            GetType::Text => Ok(Some(KvValue::Text(raw))),
            GetType::Json => {
                let value: Value = serde_json::from_str(&raw).map_err(|e| {
                    FetchError::Serialization(format!("Failed to parse as JSON: {}", e))
                })?;
                Ok(Some(KvValue::Json(value)))
            }
        }
    }
}

/// 键值存储扩展特征
#[async_trait]
pub trait KvStoreExt: KvStore {
    /// 以 JSON 模式读取
    async fn get_json(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.get(key, GetType::Json).await?.map(KvValue::into_json))
    }
}

impl<T: KvStore + ?Sized> KvStoreExt for T {}
