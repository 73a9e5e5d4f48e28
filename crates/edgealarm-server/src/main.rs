use anyhow::Result;
use std::path::Path;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use edgealarm_server::app;
use edgealarm_server::config::ServerConfig;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  edgealarm-server [config.toml]    Start the alarm manager (default: config/server.toml)");
}

#[tokio::main]
async fn main() -> Result<()> {
    edgealarm_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("edgealarm=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        other => run_server(other.unwrap_or("config/server.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = if Path::new(config_path).exists() {
        ServerConfig::load(config_path)?
    } else {
        tracing::warn!(path = config_path, "Config file not found, using defaults");
        ServerConfig::default()
    };

    tracing::info!(
        data_dir = %config.database.data_dir,
        host_ip = %config.host_ip,
        lanes = config.lane_count(),
        janitor = config.janitor.enabled,
        cert_monitor = config.cert_monitor.enabled,
        "edgealarm-server starting"
    );

    let state = app::build_state(config).await?;
    let app = app::start(state).await?;

    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    app.shutdown().await;
    Ok(())
}
