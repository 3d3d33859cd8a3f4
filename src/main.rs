// src/main.rs

//! # Cold Chain - Main Entry Point
//!
//! Loads configuration, restores the ledger from its snapshot (if one is
//! configured), serves the HTTP API, and saves the ledger again on Ctrl-C.
//!
//! ## Configuration
//! See [`cold_chain::config`]. Commonly used environment variables:
//! - `COLD_CHAIN__SERVER__HOST` / `COLD_CHAIN__SERVER__PORT`: bind address
//! - `COLD_CHAIN__SNAPSHOT_PATH`: ledger snapshot file
//! - `RUST_LOG`: log filter (overrides `log_level`)

use anyhow::Context;
use cold_chain::config::Settings;
use cold_chain::services::api_server::ApiServer;
use cold_chain::utils::serialization::{read_snapshot, write_snapshot};
use cold_chain::ColdChain;
use dotenv::dotenv;
use log::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let settings = Settings::load().context("failed to load configuration")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    let ledger = match &settings.snapshot_path {
        Some(path) if path.exists() => {
            let snapshot = read_snapshot(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            ColdChain::restore(snapshot)
                .with_context(|| format!("snapshot {} is inconsistent", path.display()))?
        }
        Some(path) => {
            info!("no snapshot at {}, starting with an empty ledger", path.display());
            ColdChain::new()
        }
        None => {
            warn!("snapshot_path not set, ledger state will not survive a restart");
            ColdChain::new()
        }
    };

    let addr = settings.socket_addr().context("invalid server address")?;
    let api_server = ApiServer::new(ledger);
    api_server
        .run(addr, shutdown_signal())
        .await
        .context("API server failed")?;

    if let Some(path) = &settings.snapshot_path {
        let snapshot = api_server.ledger().read().await.snapshot();
        write_snapshot(path, &snapshot)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        info!("ledger saved to {}", path.display());
    }
    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
