use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod analyzer;
mod api;
mod archive;
mod auth;
mod config;
mod postgres;
mod store;

use analyzer::PerceptualAnalyzer;
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "photostack", about = "Photo upload and best-shot gallery service")]
struct Cli {
    /// Path to the YAML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the configured listen address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("photostack=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        cfg.server.bind = bind;
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let pool = postgres::connect(&database_url).await?;
    let analyzer = Arc::new(PerceptualAnalyzer::new(
        cfg.analysis.hash_size,
        cfg.analysis.similarity_threshold,
    ));

    api::serve(cfg, pool, analyzer).await
}
