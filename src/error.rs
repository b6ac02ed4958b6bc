//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了拉取客户端的错误类型和处理机制。

use thiserror::Error;

/// 拉取系统错误类型枚举
///
/// 所有变体只携带字符串等可克隆数据，后台刷新的同一结果需要分发给每个等待者，
/// 因此该类型实现了 `Clone`。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// 网络传输失败（连接失败、超时等）
    #[error("Transport error: {0}")]
    Transport(String),

    /// 服务端返回非成功状态码
    #[error("HTTP error {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// 序列化/反序列化错误（包括存储中的损坏数据）
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 键值存储操作失败
    #[error("Store error: {0}")]
    StoreError(String),

    /// 非法的存储写入请求
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 操作不支持
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// 后台任务异常终止
    #[error("Background task failed: {0}")]
    Background(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Serialization(e.to_string())
    }
}

impl From<redis::RedisError> for FetchError {
    fn from(e: redis::RedisError) -> Self {
        FetchError::StoreError(e.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(e: tokio::task::JoinError) -> Self {
        FetchError::Background(e.to_string())
    }
}

/// 拉取操作结果类型别名
pub type Result<T> = std::result::Result<T, FetchError>;
