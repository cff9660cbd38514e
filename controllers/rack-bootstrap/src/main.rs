//! Rack Bootstrap
//!
//! Brings a freshly installed MAAS region and its rack of AMT-managed nodes
//! to a known state:
//! - waits for outbound network and DNS
//! - reconciles the region baseline (IP range, DHCP, settings, SSH keys,
//!   boot images, zones, tags) and imports boot images
//! - discovers every node slot, enlists it with AMT power and places it in
//!   its zone
//!
//! Every step is idempotent, so the tool can be rerun after a partial failure.

mod config;
mod controller;
mod discovery;
mod error;
mod layout;
mod readiness;
mod reconcile_helpers;
mod reconciler;
#[cfg(test)]
mod test_utils;

use crate::config::{BootstrapConfig, Cli, local_hostname};
use crate::controller::Bootstrap;
use crate::error::BootstrapError;
use clap::Parser;
use maas_client::MaasClient;
use net_probe::SystemProbe;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BootstrapError> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting rack bootstrap");

    if let Err(e) = run(cli).await {
        error!("❌ Rack bootstrap failed: {}", e);
        return Err(e);
    }

    info!("Rack bootstrap complete");
    Ok(())
}

async fn run(cli: Cli) -> Result<(), BootstrapError> {
    let hostname = local_hostname();
    let config = BootstrapConfig::from_cli(cli, hostname.as_deref())?;

    info!("Configuration:");
    info!("  Rack: {}", config.layout.rack_id());
    info!("  MAAS URL: {}", config.maas_url);
    info!("  Slots: {} ({} per zone)", config.slots, config.zone_bucket_size);
    info!("  SSH import: {}", config.ssh_import_id.as_deref().unwrap_or("disabled"));

    let client = MaasClient::new(config.maas_url.clone(), &config.api_key, config.request_timeout)?;
    let probe = SystemProbe::new(config.probe_timeout);

    let bootstrap = Bootstrap::new(config, Arc::new(client), Arc::new(probe));
    bootstrap.run().await?;
    Ok(())
}
