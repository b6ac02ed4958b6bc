//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存条目的存储格式。
//!
//! 对象负载平铺存储并追加 `hash` 字段：`{...payload, "hash": "<digest>"}`。
//! 非对象负载，或自身含有保留字段的对象负载，包装为
//! `{"$payload": <payload>, "hash": "<digest>"}`。

use crate::error::Result;
use serde_json::{Map, Value};

/// 摘要字段名
pub const HASH_FIELD: &str = "hash";
/// 包装字段名
pub const WRAPPED_FIELD: &str = "$payload";

/// 缓存条目
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// 负载数据（不含摘要字段）
    pub payload: Value,
    /// 写入时负载的摘要；由外部写入的条目可能没有
    pub hash: Option<String>,
}

impl CacheEntry {
    pub fn new(payload: Value, hash: impl Into<String>) -> Self {
        Self {
            payload,
            hash: Some(hash.into()),
        }
    }

    /// 从存储中读出的JSON还原条目
    ///
    /// JSON `null` 视为不存在
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(mut map) => {
                let hash = match map.remove(HASH_FIELD) {
                    Some(Value::String(h)) => Some(h),
                    Some(other) => {
                        // 不是摘要，属于负载本身
                        map.insert(HASH_FIELD.to_string(), other);
                        None
                    }
                    None => None,
                };
                let payload = if map.len() == 1 && map.contains_key(WRAPPED_FIELD) {
                    map.remove(WRAPPED_FIELD).unwrap_or(Value::Null)
                } else {
                    Value::Object(map)
                };
                Some(Self { payload, hash })
            }
            other => Some(Self {
                payload: other,
                hash: None,
            }),
        }
    }

    /// 转换为存储用的JSON
    pub fn into_value(self) -> Value {
        let mut map = match self.payload {
            Value::Object(map)
                if !map.contains_key(HASH_FIELD) && !map.contains_key(WRAPPED_FIELD) =>
            {
                map
            }
            payload => {
                let mut map = Map::new();
                map.insert(WRAPPED_FIELD.to_string(), payload);
                map
            }
        };
        if let Some(hash) = self.hash {
            map.insert(HASH_FIELD.to_string(), Value::String(hash));
        }
        Value::Object(map)
    }

    /// 序列化为存储字符串
    pub fn to_store_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.clone().into_value())?)
    }
}
