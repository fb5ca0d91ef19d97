//! Hangar - Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hangar::{Config, HangarServer, config::defaults};

#[derive(Parser, Debug)]
#[command(name = "hangar")]
#[command(about = "OAuth2 authorization-code playground for environment-configured providers")]
#[command(version)]
struct Cli {
    /// Env file read before the process environment (missing file is fine)
    #[arg(long, default_value = defaults::ENV_FILE)]
    env_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Hangar");

    let config = Config::from_env(&cli.env_file).context("Failed to load configuration")?;

    if let Err(e) = HangarServer::new(config).run().await {
        tracing::error!(error = %e, "Hangar server failed");
        return Err(e.into());
    }

    Ok(())
}
