//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 敏感信息脱敏工具
//!
//! 资源标识通常是URL，可能在用户信息或查询参数中携带凭据，
//! 写入日志前需要脱敏。

use reqwest::Url;
use std::fmt;

const SENSITIVE_PARAMS: &[&str] = &[
    "token",
    "password",
    "secret",
    "api_key",
    "apikey",
    "key",
    "auth",
    "credential",
    "signature",
    "sig",
    "session",
];

/// 脱敏敏感信息
///
/// 返回脱敏后的字符串，格式为：`****{last_chars}`
///
/// ```
/// use oxfetch::utils::redaction::redact_value;
/// assert_eq!(redact_value("password123", 3), "****123");
/// ```
pub fn redact_value(value: &str, visible_chars: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= visible_chars {
        "*".repeat(chars.len())
    } else {
        let tail: String = chars[chars.len() - visible_chars..].iter().collect();
        format!("****{}", tail)
    }
}

fn is_sensitive_param(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_PARAMS
        .iter()
        .any(|p| lower == *p || lower.ends_with(&format!("_{}", p)))
}

/// 脱敏URL
///
/// 隐藏用户信息中的密码以及敏感查询参数的值；无法解析的输入只截断长度
pub fn redact_url(resource_id: &str) -> String {
    let mut url = match Url::parse(resource_id) {
        Ok(url) => url,
        Err(_) => return truncate(resource_id, 100),
    };

    if let Some(password) = url.password().map(redact_secret) {
        let _ = url.set_password(Some(&password));
    }

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if is_sensitive_param(&k) {
                    redact_secret(&v)
                } else {
                    v.into_owned()
                };
                (k.into_owned(), v)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.to_string()
}

/// 凭据不保留任何字符
fn redact_secret(value: &str) -> String {
    redact_value(value, 0)
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

/// 脱敏URL包装器
///
/// 用于在日志字段中直接记录资源标识
pub struct RedactedUrl<'a>(pub &'a str);

impl fmt::Display for RedactedUrl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact_url(self.0))
    }
}

impl fmt::Debug for RedactedUrl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}
