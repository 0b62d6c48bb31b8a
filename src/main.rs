//! AIS target registry service

use std::sync::Arc;

use ais_registry::config::AppConfig;
use ais_registry::errors::RegistryError;
use ais_registry::loops::{run_feed_loop, run_snapshot_loop, run_sweep_loop};
use ais_registry::mqtt::MqttClientBuilder;
use ais_registry::registry::TargetRegistry;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), RegistryError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Environment variables override the config file
    let config = AppConfig::load()?;
    config.validate()?;

    let registry = Arc::new(TargetRegistry::new(config.registry.clone()));
    // Restore before any message is ingested
    registry.load_from(&config.snapshot.path).await;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut tasks = Vec::new();

    tasks.push(tokio::spawn(run_sweep_loop(
        registry.clone(),
        config.registry.sweep_interval,
        shutdown_tx.subscribe(),
    )));
    tasks.push(tokio::spawn(run_snapshot_loop(
        registry.clone(),
        config.snapshot.path.clone(),
        config.snapshot.save_interval,
        shutdown_tx.subscribe(),
    )));

    match &config.mqtt {
        Some(mqtt) => {
            let client = MqttClientBuilder::new(mqtt)?.connect(&mqtt.topics);
            tasks.push(tokio::spawn(run_feed_loop(
                registry.clone(),
                client,
                shutdown_tx.subscribe(),
            )));
        }
        None => warn!("No MQTT feed configured, serving restored targets only"),
    }

    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Received shutdown signal");

    let _ = shutdown_tx.send(());
    for task in tasks {
        if let Err(e) = task.await {
            error!("Background task failed: {}", e);
        }
    }

    registry.save_to(&config.snapshot.path).await?;
    Ok(())
}
