//! Exchange maintenance watcher - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Watches withdraw/deposit maintenance per currency and chain.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MWATCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection
    mwatch_ws::init_crypto();

    let args = Args::parse();

    // Config path: CLI arg > MWATCH_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("MWATCH_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = mwatch_bot::AppConfig::from_file(&config_path)?;

    mwatch_telemetry::init_logging(&config.log_level)?;

    info!("Starting mwatch v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        rest_url = %config.rest_url,
        ws_url = %config.ws_url,
        state_file = %config.persistence.state_file,
        telegram = config.telegram.is_usable(),
        dashboard = config.dashboard.enabled,
        "Configuration loaded"
    );

    let mut app = mwatch_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
