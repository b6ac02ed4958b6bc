//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了摘要命令的实现。

use crate::cli::HashArgs;
use crate::hasher;
use anyhow::Result;

pub fn execute(args: &HashArgs) -> Result<()> {
    println!("{}", hasher::digest_str(&args.input));
    Ok(())
}
