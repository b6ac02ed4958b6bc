//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了指标查询命令的实现。

use crate::cli::MetricsArgs;
use crate::metrics::{get_metrics_string, GLOBAL_METRICS};
use anyhow::Result;

pub fn execute(args: &MetricsArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&GLOBAL_METRICS.to_json())?);
        return Ok(());
    }

    let output = get_metrics_string();
    if output.is_empty() {
        println!("No metrics recorded.");
    } else {
        print!("{}", output);
    }
    Ok(())
}
