//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 内容摘要工具：基于 SHA-256，输出 64 位小写十六进制字符串，
//! 同时用作存储键和内容变更检测。

use serde_json::Value;
use sha2::{Digest, Sha256};

/// 摘要的十六进制长度
pub const DIGEST_HEX_LEN: usize = 64;

/// 计算任意字节序列的摘要
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// 计算字符串的摘要
pub fn digest_str(input: &str) -> String {
    digest(input.as_bytes())
}

/// 计算 JSON 值的摘要
///
/// 对紧凑序列化结果求摘要。`serde_json::Map` 按键排序，
/// 因此同一内容总得到同一摘要。
pub fn digest_json(value: &Value) -> String {
    // Value 的序列化不会失败
    digest(value.to_string().as_bytes())
}

/// 由资源标识派生存储键
pub fn store_key(prefix: &str, resource_id: &str) -> String {
    let hash = digest_str(resource_id);
    if prefix.is_empty() {
        hash
    } else {
        format!("{}{}", prefix, hash)
    }
}
