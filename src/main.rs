//! meshpeer daemon entry point.

use std::time::Duration;

use log::{error, info, warn};
use tokio::signal;
use tokio::sync::mpsc;

use meshpeer::config::Config;
use meshpeer::expiration::run_expiration_loop;
use meshpeer::registry::PeerRegistry;
use meshpeer::settings::Settings;
use meshpeer::source::{JsonLinesSource, UpdateSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting meshpeer with config: {:?}", cfg);

    let settings = Settings::from(&cfg);
    let registry = PeerRegistry::new(settings);

    // Update channel
    let (update_tx, mut update_rx) = mpsc::channel(128);

    // Update source (JSON lines on stdin)
    let source = JsonLinesSource::stdin();
    let source_handle = tokio::spawn(async move {
        if let Err(e) = source.monitor(update_tx).await {
            error!("Update source failed: {}", e);
        }
    });

    // Apply updates to the registry
    let registry_for_updates = registry.clone();
    let apply_handle = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            let peer_id = update.peer_id().to_string();
            if let Err(e) = registry_for_updates.apply(update).await {
                warn!("Rejected update for peer {}: {}", peer_id, e);
            }
        }
        info!("Update channel closed");
    });

    // Login expiration
    let floor = Duration::from_secs(cfg.expiration_check_floor_secs);
    let expiration_handle = tokio::spawn(run_expiration_loop(registry, floor));

    // Graceful Shutdown
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    // Abort tasks
    source_handle.abort();
    apply_handle.abort();
    expiration_handle.abort();

    info!("Shutdown complete.");
    Ok(())
}
