//! Live gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p live-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use anyhow::Context;
use live_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = ?e, "Gateway failed to start");
        eprintln!("live-gateway: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        storage = ?config.storage,
        address = %config.gateway.address(),
        "Configuration loaded"
    );

    live_gateway::run(config).await.context("Gateway stopped")?;

    Ok(())
}
