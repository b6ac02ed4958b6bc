//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oxfetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long, global = true, help = "Enable the OpenTelemetry tracing layer")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "fetch", about = "Fetch resources through the cache")]
    Fetch(FetchArgs),

    #[command(name = "hash", about = "Print the store key digest of an input")]
    Hash(HashArgs),

    #[command(name = "metrics", about = "Get fetch metrics")]
    Metrics(MetricsArgs),
}

#[derive(Parser, Debug)]
pub struct FetchArgs {
    #[arg(required = true, help = "Resource URLs to fetch")]
    pub urls: Vec<String>,

    #[arg(short, long, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Service name to use from the config")]
    pub service: Option<String>,

    #[arg(short, long, help = "Wait for background refreshes and print them")]
    pub wait: bool,
}

#[derive(Parser, Debug)]
pub struct HashArgs {
    #[arg(help = "Input string, usually a resource URL")]
    pub input: String,
}

#[derive(Parser, Debug)]
pub struct MetricsArgs {
    #[arg(short, long, help = "Output in JSON format")]
    pub json: bool,
}

mod fetch;
mod hash;
mod metrics;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("oxfetch", cli.otel);

    match &cli.command {
        Commands::Fetch(args) => fetch::execute(args).await,
        Commands::Hash(args) => hash::execute(args),
        Commands::Metrics(args) => metrics::execute(args),
    }
}
