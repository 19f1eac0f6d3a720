//! Retro Board - shared retro board server
//!
//! Usage: `retro-board [config.toml]`

use std::path::PathBuf;

use retro_net::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod settings;

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Retro Board");

    let config_arg = std::env::args().nth(1).map(PathBuf::from);
    let config = match settings::load(config_arg.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        let server = match Server::start(config).await {
            Ok(server) => server,
            Err(e) => {
                tracing::error!("Failed to start server: {}", e);
                std::process::exit(1);
            }
        };

        tracing::info!(addr = %server.addr(), "Board is live");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }

        tracing::info!("Received Ctrl+C, shutting down");
        server.shutdown().await;
    });
}
