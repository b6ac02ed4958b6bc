//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 统一工具模块
//!
//! 提供测试和示例共用的工具函数，包括：
//! - 日志设置工具
//! - 唯一名称生成工具
//! - 输入验证工具

pub mod redaction;

use crate::error::FetchError;
use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 生成唯一的名称
pub fn generate_unique_name(base: &str) -> String {
    format!("{}_{}", base, uuid::Uuid::new_v4().simple())
}

pub fn validate_key_length(key: &str, max_length: usize) -> Result<(), FetchError> {
    if key.is_empty() {
        return Err(FetchError::InvalidInput(
            "Store key cannot be empty".to_string(),
        ));
    }
    if key.len() > max_length {
        return Err(FetchError::InvalidInput(format!(
            "Store key exceeds maximum length of {} bytes (got {} bytes)",
            max_length,
            key.len()
        )));
    }
    Ok(())
}

pub fn validate_value_size(value: &[u8], max_size: usize) -> Result<(), FetchError> {
    if value.len() > max_size {
        return Err(FetchError::InvalidInput(format!(
            "Store value exceeds maximum size of {} bytes (got {} bytes)",
            max_size,
            value.len()
        )));
    }
    Ok(())
}
