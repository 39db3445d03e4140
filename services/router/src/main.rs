//! Sluice router entry point
//!
//! Loads configuration, builds the registry, hands it to the registry actor
//! and answers newline-delimited JSON requests on stdin until end of input.
//! Logs go to stderr so stdout carries only responses.

mod protocol;
mod server;

use std::path::PathBuf;

use actors::RegistryActor;
use anyhow::{Context, Result};
use clap::Parser;
use config::{build_registry, default_config_path, RouterConfig};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Environment overlay name (environments/<name>.toml next to the config file)
    #[arg(short, long)]
    env: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = RouterConfig::load(&args.config, args.env.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    init_logging(&config.log_level, args.json_logs);

    info!("Starting Sluice router");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let registry = build_registry(&config).context("Failed to build registry")?;
    let (handle, task) = RegistryActor::spawn(registry);

    let served = server::serve(&handle, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!(served, "input closed");

    let registry = handle
        .shutdown()
        .await
        .context("Failed to stop registry actor")?;
    task.await.context("Registry actor task failed")?;

    let stats = handle.stats();
    info!(
        positions = registry.all_positions().count(),
        requests = stats.requests_processed,
        rejected = stats.requests_rejected,
        "router stopped"
    );
    Ok(())
}
