//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了拉取客户端管理器，负责按配置初始化并登记各服务的客户端。

use crate::client::Fetcher;
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::metrics::GLOBAL_METRICS;
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::{info, instrument};

/// 拉取客户端管理器
pub struct FetcherManager;

lazy_static! {
    pub static ref MANAGER: Arc<DashMap<String, Arc<Fetcher>>> = Arc::new(DashMap::new());
}

impl FetcherManager {
    /// 初始化管理器
    ///
    /// 根据配置初始化所有服务的拉取客户端，已存在的同名服务会被覆盖
    ///
    /// # 参数
    ///
    /// * `config` - 系统配置
    #[instrument(skip(config), level = "info", fields(service_count = config.services.len()))]
    pub async fn init(config: Config) -> Result<()> {
        if let Err(e) = config.validate() {
            return Err(FetchError::ConfigError(e));
        }

        info!(
            "Initializing FetcherManager with {} services",
            config.services.len()
        );
        GLOBAL_METRICS.set_enabled(config.global.enable_metrics);

        // 全部构建成功后再登记，避免部分初始化
        let mut built = Vec::with_capacity(config.services.len());
        for (name, service_cfg) in &config.services {
            let fetcher = Fetcher::from_config(name, &config.global, service_cfg).await?;
            built.push((name.clone(), Arc::new(fetcher)));
        }

        for (name, fetcher) in built {
            MANAGER.insert(name, fetcher);
        }
        Ok(())
    }

    /// 手动登记一个客户端
    pub fn register(name: impl Into<String>, fetcher: Fetcher) {
        MANAGER.insert(name.into(), Arc::new(fetcher));
    }

    /// 已登记的服务名称
    pub fn services() -> Vec<String> {
        let mut names: Vec<String> = MANAGER.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// 重置管理器（仅用于测试）
    ///
    /// 清除所有已登记的客户端
    #[doc(hidden)]
    pub fn reset() {
        MANAGER.clear();
    }
}

/// 获取指定服务的拉取客户端
///
/// # 参数
///
/// * `service` - 服务名称
///
/// # 返回值
///
/// 返回对应服务的客户端，如果服务不存在则返回错误
pub fn get_fetcher(service: &str) -> Result<Arc<Fetcher>> {
    MANAGER
        .get(service)
        .map(|r| r.value().clone())
        .ok_or_else(|| FetchError::ConfigError(format!("Service '{}' not found", service)))
}
