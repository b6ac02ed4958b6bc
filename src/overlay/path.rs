//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 点分路径解析与查找。

use serde_json::Value;
use std::fmt;

/// 点分路径，如 `user.profile.name`
///
/// 第一段称为分区（section），对应 `server.<section>` 下的服务端数据
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// 第一段
    pub fn section(&self) -> &str {
        // split 至少产生一段
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    /// 除第一段以外的部分
    pub fn rest(&self) -> &[String] {
        self.segments.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// 沿路径逐段查找
///
/// 任一中间段不存在时返回None，不会出错。数组用数字段下标访问。
pub fn walk<'a, S: AsRef<str>>(value: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| step(current, segment.as_ref()))
}

fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
