//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 数据图：普通数据加上保留的 `server` 分区，分区中的值可能仍在等待后台刷新。

use super::path::{walk, Path};
use crate::client::ServerRefresh;
use crate::error::{FetchError, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// 保留的服务端分区名
pub const SERVER_KEY: &str = "server";

/// `server` 分区中的一个槽位
#[derive(Debug, Clone)]
pub enum Slot {
    /// 已解析的数据
    Resolved(Value),
    /// 尚未完成的后台刷新
    Pending(ServerRefresh),
}

impl Slot {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending(_))
    }

    /// 槽位是否有值（`null` 视为无值）
    pub fn is_present(&self) -> bool {
        !matches!(self, Slot::Resolved(Value::Null))
    }
}

/// 数据图
#[derive(Debug, Clone, Default)]
pub struct DataGraph {
    data: Map<String, Value>,
    server: IndexMap<String, Slot>,
}

impl DataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从JSON对象构建
    ///
    /// 顶层 `server` 键下的对象成员成为已解析的服务端槽位
    pub fn from_value(value: Value) -> Result<Self> {
        let mut data = match value {
            Value::Object(map) => map,
            other => {
                return Err(FetchError::InvalidInput(format!(
                    "data graph root must be an object, got {}",
                    type_name(&other)
                )))
            }
        };

        let mut server = IndexMap::new();
        match data.remove(SERVER_KEY) {
            Some(Value::Object(sections)) => {
                for (section, v) in sections {
                    server.insert(section, Slot::Resolved(v));
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                return Err(FetchError::InvalidInput(format!(
                    "`{}` must be an object, got {}",
                    SERVER_KEY,
                    type_name(&other)
                )))
            }
        }

        Ok(Self { data, server })
    }

    /// 写入普通数据
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// 写入已解析的服务端数据
    pub fn insert_server(&mut self, section: impl Into<String>, value: Value) {
        self.server.insert(section.into(), Slot::Resolved(value));
    }

    /// 写入进行中的后台刷新
    pub fn insert_pending(&mut self, section: impl Into<String>, refresh: ServerRefresh) {
        self.server.insert(section.into(), Slot::Pending(refresh));
    }

    pub fn server_slot(&self, section: &str) -> Option<&Slot> {
        self.server.get(section)
    }

    pub(crate) fn set_slot(&mut self, section: &str, slot: Slot) {
        self.server.insert(section.to_string(), slot);
    }

    /// 按路径查找
    ///
    /// 以 `server` 开头的路径进入服务端分区；待定槽位不可见，其下的路径都返回None
    pub fn resolve(&self, path: &Path) -> Option<Value> {
        if path.section() == SERVER_KEY {
            let rest = path.rest();
            let Some((section, tail)) = rest.split_first() else {
                return Some(self.server_value());
            };
            return match self.server.get(section)? {
                Slot::Resolved(v) => walk(v, tail).cloned(),
                Slot::Pending(_) => None,
            };
        }
        let (first, tail) = path.segments().split_first()?;
        walk(self.data.get(first)?, tail).cloned()
    }

    /// 服务端分区中已解析的部分
    fn server_value(&self) -> Value {
        Value::Object(
            self.server
                .iter()
                .filter_map(|(k, slot)| match slot {
                    Slot::Resolved(v) => Some((k.clone(), v.clone())),
                    Slot::Pending(_) => None,
                })
                .collect(),
        )
    }

    /// 导出为JSON，待定槽位被省略
    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        if !self.server.is_empty() {
            map.insert(SERVER_KEY.to_string(), self.server_value());
        }
        Value::Object(map)
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
