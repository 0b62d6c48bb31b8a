//! Background tasks driving the registry

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::mqtt::MqttClient;
use crate::registry::TargetRegistry;

/// Periodic staleness sweep. Everything is published once on start so new
/// listeners see the restored picture.
pub async fn run_sweep_loop(
    registry: Arc<TargetRegistry>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    registry.publish_all();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Sweep loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                registry.sweep();
                debug!("Sweep done, {} targets", registry.target_count());
            }
        }
    }
}

/// Periodic snapshot to disk; save failures are logged and retried next tick
pub async fn run_snapshot_loop(
    registry: Arc<TargetRegistry>,
    path: PathBuf,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick fires immediately; nothing new to save yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Snapshot loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = registry.save_to(&path).await {
                    error!("Failed to save snapshot to {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Feed every message from the MQTT client into the registry
pub async fn run_feed_loop(
    registry: Arc<TargetRegistry>,
    mut client: MqttClient,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Feed loop shutting down");
                client.abort();
                break;
            }
            message = client.recv() => {
                match message {
                    Some(message) => registry.ingest(message),
                    None => {
                        error!("AIS feed ended");
                        break;
                    }
                }
            }
        }
    }
}
