//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志和链路追踪的初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化 tracing
///
/// 日志级别由 `RUST_LOG` 控制，默认为 `info`。
/// 此函数应该在应用程序启动时调用一次；全局 subscriber 已存在时静默跳过。
///
/// # 参数
///
/// * `service_name` - 服务名称，作为 tracer 名称
/// * `with_otel` - 是否附加 OpenTelemetry layer
pub fn init_tracing(service_name: &str, with_otel: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if with_otel {
        // 未配置 exporter 时 provider 为 no-op，由应用层替换
        let provider = SdkTracerProvider::builder().build();
        global::set_tracer_provider(provider.clone());
        let tracer = provider.tracer(service_name.to_string());
        let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
        let _ = registry.with(telemetry).try_init();
    } else {
        let _ = registry.try_init();
    }
}
