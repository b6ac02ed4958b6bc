//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了网络传输接口及基于reqwest的HTTP实现。

use crate::error::{FetchError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// 传输层响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP状态码
    pub status: u16,
    /// 响应体文本
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 状态码是否为 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 将响应体解析为JSON
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            FetchError::Serialization(format!("Response body is not valid JSON: {}", e))
        })
    }
}

/// 网络传输特征
///
/// 按资源标识获取响应；连接失败、超时等返回 `FetchError::Transport`，
/// 状态码由调用方判断
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, resource_id: &str) -> Result<TransportResponse>;
}

/// 基于reqwest的HTTP传输
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// 创建HTTP传输
    ///
    /// # 参数
    ///
    /// * `timeout_ms` - 单次请求超时（毫秒）
    /// * `user_agent` - User-Agent 头
    pub fn new(timeout_ms: u64, user_agent: &str) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .default_headers(default_headers)
            .build()
            .map_err(|e| FetchError::ConfigError(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, resource_id), level = "debug", fields(url = %crate::utils::redaction::RedactedUrl(resource_id)))]
    async fn get(&self, resource_id: &str) -> Result<TransportResponse> {
        let response = self.client.get(resource_id).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, body_len = body.len(), "http response received");
        Ok(TransportResponse { status, body })
    }
}
