//! NovaTrade edge agent - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// NovaTrade edge agent: polls the command Bus and executes trades.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via EDGE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    edge_agent::logging::init_logging()?;

    info!("Starting edge agent v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > EDGE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("EDGE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = edge_agent::AppConfig::from_file(&config_path)?;

    let app = edge_agent::Application::new(config)?;
    app.run().await?;

    Ok(())
}
