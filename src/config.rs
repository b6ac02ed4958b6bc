//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了拉取客户端的配置结构和解析逻辑。

use crate::error::{FetchError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

/// 默认缓存保留时间：一年（秒）
pub const DEFAULT_TTL_SECS: u64 = 31_536_000;

/// TTL 上限：十年（秒）
const MAX_TTL_SECS: u64 = DEFAULT_TTL_SECS * 10;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
}

/// 全局配置
///
/// 定义适用于所有服务的默认配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GlobalConfig {
    /// 缓存条目的默认保留时间（秒），作为提示传给存储
    pub default_ttl_secs: u64,
    /// 网络请求超时时间（毫秒）
    pub request_timeout_ms: u64,
    /// HTTP User-Agent
    pub user_agent: String,
    /// 是否启用指标收集
    pub enable_metrics: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL_SECS,
            request_timeout_ms: 10_000,
            user_agent: concat!("oxfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            enable_metrics: true,
        }
    }
}

/// 服务配置
///
/// 每个服务对应一个独立的拉取客户端
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// 缓存保留时间（秒），可覆盖全局配置
    pub ttl_secs: Option<u64>,
    /// 请求超时（毫秒），可覆盖全局配置
    pub request_timeout_ms: Option<u64>,
    /// 存储键前缀
    pub key_prefix: String,
    /// 存储配置
    pub store: StoreConfig,
}

/// 存储后端类型
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// 进程内存储
    #[default]
    Memory,
    /// Redis 存储
    Redis,
}

/// 存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StoreConfig {
    /// 后端类型
    pub backend: StoreBackend,
    /// 最大条目数（仅内存存储）
    pub max_capacity: u64,
    /// 键的最大长度
    pub max_key_length: usize,
    /// 值的最大大小（字节）
    pub max_value_size: usize,
    /// Redis 连接字符串
    pub connection_string: SecretString,
    /// Redis 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            max_capacity: 10_000,
            max_key_length: 256,
            max_value_size: 1024 * 1024 * 10, // 10MB
            connection_string: SecretString::new("redis://127.0.0.1:6379".to_string().into()),
            connection_timeout_ms: 5000,
        }
    }
}

impl ServiceConfig {
    /// 结合全局配置得到实际生效的 TTL
    pub fn effective_ttl(&self, global: &GlobalConfig) -> u64 {
        self.ttl_secs.unwrap_or(global.default_ttl_secs)
    }

    /// 结合全局配置得到实际生效的请求超时
    pub fn effective_timeout_ms(&self, global: &GlobalConfig) -> u64 {
        self.request_timeout_ms.unwrap_or(global.request_timeout_ms)
    }
}

impl Config {
    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FetchError::ConfigError(e.to_string()))
    }

    /// 从 TOML 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FetchError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值都在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        validate_ttl("Global default_ttl_secs", self.global.default_ttl_secs)?;
        validate_timeout("Global request_timeout_ms", self.global.request_timeout_ms)?;

        for (name, service) in &self.services {
            if name.is_empty() {
                return Err("Service name cannot be empty".to_string());
            }

            if name.len() > 64 {
                return Err(format!(
                    "Service name '{}' exceeds maximum length of 64 characters",
                    name
                ));
            }

            if let Some(ttl) = service.ttl_secs {
                validate_ttl(&format!("Service '{}' ttl_secs", name), ttl)?;
            }

            if let Some(timeout) = service.request_timeout_ms {
                validate_timeout(&format!("Service '{}' request_timeout_ms", name), timeout)?;
            }

            let store = &service.store;
            if store.max_key_length == 0 || store.max_key_length > 1024 {
                return Err(format!(
                    "Service '{}' max_key_length must be between 1 and 1024",
                    name
                ));
            }

            // 键至少要能放下前缀和 64 位摘要
            if service.key_prefix.len() + crate::hasher::DIGEST_HEX_LEN > store.max_key_length {
                return Err(format!(
                    "Service '{}' key_prefix is too long for max_key_length {}",
                    name, store.max_key_length
                ));
            }

            if store.max_value_size == 0 || store.max_value_size > 512 * 1024 * 1024 {
                return Err(format!(
                    "Service '{}' max_value_size must be between 1 and 512MB",
                    name
                ));
            }

            match store.backend {
                StoreBackend::Memory => {
                    if store.max_capacity == 0 {
                        return Err(format!("Service '{}' max_capacity cannot be zero", name));
                    }
                }
                StoreBackend::Redis => {
                    let conn = store.connection_string.expose_secret();
                    if !conn.starts_with("redis://") && !conn.starts_with("rediss://") {
                        return Err(format!(
                            "Service '{}' connection_string must start with redis:// or rediss://",
                            name
                        ));
                    }
                    if !(100..=30000).contains(&store.connection_timeout_ms) {
                        return Err(format!(
                            "Service '{}' connection_timeout_ms must be between 100 and 30000 ms",
                            name
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_ttl(field: &str, ttl: u64) -> std::result::Result<(), String> {
    if ttl == 0 {
        return Err(format!("{} cannot be zero", field));
    }
    if ttl > MAX_TTL_SECS {
        return Err(format!(
            "{} cannot exceed 10 years ({} seconds)",
            field, MAX_TTL_SECS
        ));
    }
    Ok(())
}

fn validate_timeout(field: &str, timeout_ms: u64) -> std::result::Result<(), String> {
    if !(1..=300_000).contains(&timeout_ms) {
        return Err(format!("{} must be between 1 and 300000 ms", field));
    }
    Ok(())
}
