//! meilimap binary: load configuration, connect to MeiliSearch, and run the
//! generator until every one-shot source is done (or until ctrl-c for live
//! sources and the file server).

use anyhow::{Context, Result};
use clap::Parser;
use meilimap::config::{Config, ConfigError};
use meilimap::fetch::MeiliClient;
use meilimap::generator::Generator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "meilimap", version, about = "Sitemap generator for MeiliSearch")]
struct Args {
    /// Path to the configuration file (YAML or JSON).
    #[arg(short, long, default_value = "./config.yml")]
    config: PathBuf,

    /// Directory the generated sitemap files are stored under.
    #[arg(short, long, default_value = "./sitemap")]
    store: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meilimap=info".parse().expect("static directive parses")),
        )
        .init();

    if let Err(err) = run(args).await {
        error!(%err, "fatal");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    cfg.validate().context("invalid config")?;
    info!("configuration file loaded");

    std::fs::create_dir_all(&args.store)
        .with_context(|| format!("failed to create store directory {}", args.store.display()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        warn!("cancellation signal received");
        let _ = shutdown_tx.send(true);
    });

    let general = cfg.general()?;
    let meili_cfg = general
        .meilisearch
        .as_ref()
        .ok_or(ConfigError::MissingMeilisearch)?;
    let client = MeiliClient::connect(meili_cfg, shutdown_rx.clone()).await?;

    let generator = Generator::new(
        general,
        &cfg.sitemaps,
        &args.store,
        Arc::new(client),
        shutdown_rx,
    )?;

    generator.run().await
}
