//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了拉取命令的实现。

use crate::backend::MemoryStore;
use crate::cli::FetchArgs;
use crate::client::Fetcher;
use crate::config::{Config, GlobalConfig};
use crate::manager::{get_fetcher, FetcherManager};
use crate::metrics::get_metrics_string;
use crate::transport::HttpTransport;
use anyhow::{bail, Context, Result};
use serde_json::json;
use std::sync::Arc;

pub async fn execute(args: &FetchArgs) -> Result<()> {
    let fetcher = resolve_fetcher(args).await?;

    let results = fetcher.fetch_all_settled(&args.urls).await;
    for (url, result) in args.urls.iter().zip(results) {
        let output = match result {
            Ok(result) => {
                let cached = result.is_cached();
                let (data, server) = result.into_parts();
                let mut output = json!({ "url": url, "cached": cached, "data": data });
                if args.wait {
                    if let Some(server) = server {
                        output["server"] = match server.await {
                            Ok(v) => v,
                            Err(e) => json!({ "error": e.to_string() }),
                        };
                    }
                }
                output
            }
            Err(e) => json!({ "url": url, "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    tracing::debug!("metrics after fetch:\n{}", get_metrics_string());
    Ok(())
}

async fn resolve_fetcher(args: &FetchArgs) -> Result<Arc<Fetcher>> {
    let Some(path) = &args.config else {
        if args.service.is_some() {
            bail!("--service requires --config");
        }
        let global = GlobalConfig::default();
        let transport = HttpTransport::new(global.request_timeout_ms, &global.user_agent)?;
        let fetcher = Fetcher::builder()
            .name("cli")
            .store(Arc::new(MemoryStore::default()))
            .transport(Arc::new(transport))
            .ttl(global.default_ttl_secs)
            .build()?;
        return Ok(Arc::new(fetcher));
    };

    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    FetcherManager::init(config).await?;

    let service = match &args.service {
        Some(s) => s.clone(),
        None => {
            let services = FetcherManager::services();
            match services.as_slice() {
                [only] => only.clone(),
                [] => bail!("Config defines no services"),
                _ => bail!(
                    "Config defines several services ({}), pick one with --service",
                    services.join(", ")
                ),
            }
        }
    };
    Ok(get_fetcher(&service)?)
}
