mod config;
mod game;
mod net;
mod util;

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, Level};

use crate::config::ServerConfig;
use crate::net::server::{start_tick_loop, GameServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Petal Royale Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}:{}, max_clients={}, tick={}ms",
        config.bind_address, config.port, config.max_clients, config.tick_duration_ms
    );

    let server = Arc::new(RwLock::new(GameServer::new(config)));

    // The transport layer attaches here: it feeds inbound frames through
    // GameServer::apply_inbound and delivers the frames from this channel.
    let (outbound_tx, mut outbound_rx) = mpsc::channel(1024);
    let tick_loop = start_tick_loop(server.clone(), outbound_tx);

    let delivery = tokio::spawn(async move {
        while let Some((client, frame)) = outbound_rx.recv().await {
            debug!("Outbound frame for {}: {} bytes", client, frame.len());
        }
    });

    info!("Server ready");

    // Shutdown signal handler
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    tick_loop.abort();
    delivery.abort();
    info!("Server stopped");

    Ok(())
}
