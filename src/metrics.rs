//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了拉取客户端的指标收集和监控功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{span, Level};

/// 指标收集器
///
/// 用于收集和存储拉取客户端的各种运行时指标
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "service:layer:op:result"
    pub requests_total: Arc<Mutex<HashMap<String, u64>>>,
    /// 操作耗时（累积时间和计数）
    /// key: "service:layer:op" -> (total_duration_secs, count)
    pub operation_duration: Arc<Mutex<HashMap<String, (f64, u64)>>>,
    disabled: Arc<AtomicBool>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Metrics {
    /// 开启或关闭指标收集，关闭后记录操作直接返回
    pub fn set_enabled(&self, enabled: bool) {
        self.disabled.store(!enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::Relaxed)
    }

    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `service` - 服务名称
    /// * `layer` - 所在层（store/network/overlay）
    /// * `op` - 操作类型（fetch/refresh/write/load）
    /// * `result` - 操作结果（hit/miss/success/stale/error/skip）
    pub fn record_request(&self, service: &str, layer: &str, op: &str, result: &str) {
        if !self.is_enabled() {
            return;
        }
        let span = span!(Level::TRACE, "fetch_request", service, layer, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}:{}", service, layer, op, result);
        *lock(&self.requests_total).entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, service: &str, layer: &str, op: &str, duration_secs: f64) {
        if !self.is_enabled() {
            return;
        }
        let key = format!("{}:{}:{}", service, layer, op);
        let mut map = lock(&self.operation_duration);
        let entry = map.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 读取某个计数器的值
    pub fn request_count(&self, service: &str, layer: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}:{}", service, layer, op, result);
        lock(&self.requests_total).get(&key).copied().unwrap_or(0)
    }

    /// 清空所有指标（仅用于测试）
    #[doc(hidden)]
    pub fn reset(&self) {
        lock(&self.requests_total).clear();
        lock(&self.operation_duration).clear();
    }

    /// 以 JSON 形式导出
    pub fn to_json(&self) -> serde_json::Value {
        let reqs = lock(&self.requests_total);
        let dur = lock(&self.operation_duration);
        let durations: serde_json::Map<String, serde_json::Value> = dur
            .iter()
            .map(|(k, (total, count))| {
                (
                    k.clone(),
                    serde_json::json!({ "total_secs": total, "count": count }),
                )
            })
            .collect();
        serde_json::json!({
            "requests_total": *reqs,
            "operation_duration": durations,
        })
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为Prometheus文本格式
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let reqs = lock(&metrics.requests_total);
    let dur = lock(&metrics.operation_duration);

    let mut keys: Vec<&String> = reqs.keys().collect();
    keys.sort();

    let mut output = String::new();
    for k in keys {
        let parts: Vec<&str> = k.splitn(4, ':').collect();
        if parts.len() == 4 {
            output.push_str(&format!(
                "oxfetch_requests_total{{service=\"{}\", layer=\"{}\", operation=\"{}\", result=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], parts[3], reqs[k]
            ));
        }
    }
    for (k, (total, count)) in dur.iter() {
        let parts: Vec<&str> = k.splitn(3, ':').collect();
        if parts.len() == 3 {
            output.push_str(&format!(
                "oxfetch_operation_duration_seconds_sum{{service=\"{}\", layer=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], total
            ));
            output.push_str(&format!(
                "oxfetch_operation_duration_seconds_count{{service=\"{}\", layer=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], count
            ));
        }
    }
    output
}
