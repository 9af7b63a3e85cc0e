//! # occupancyd: occupancy simulation daemon
//!
//! Composition root that wires the device host to the scheduler.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Populate the virtual device host
//! - Validate and activate the configured randomizers
//! - Run the scheduler loop until SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no scheduling logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use occupancy_adapter_virtual::VirtualDeviceRegistry;
use occupancy_app::scheduler::SchedulerService;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!(
        tick_secs = config.scheduler.tick_secs,
        devices = config.devices.len(),
        randomizers = config.randomizers.len(),
        "occupancyd starting"
    );

    // Devices
    let registry = Arc::new(VirtualDeviceRegistry::default());
    for device in &config.devices {
        registry.add_device(device.id, device.name.clone(), device.on);
    }

    // Scheduler
    let scheduler = SchedulerService::new(Arc::clone(&registry), config.tick());
    for entry in &config.randomizers {
        match entry.to_raw().validate() {
            Ok(randomizer) => {
                scheduler.activate(&randomizer, entry.enabled).await;
            }
            Err(err) => {
                tracing::error!(
                    randomizer_id = %entry.id,
                    error = %err,
                    "invalid randomizer configuration, skipped"
                );
            }
        }
    }

    let handle = scheduler.start();
    tracing::info!("scheduler running, press Ctrl+C to exit");

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(err) => tracing::error!(error = %err, "failed to listen for shutdown signal"),
    }

    handle.stop().await;
    tracing::info!("occupancyd stopped");
    Ok(())
}
