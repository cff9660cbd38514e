//! Baseline reconciliation against MAAS.
//!
//! This module is organized by MAAS API area:
//! - `network`: IP ranges, DHCP and region DNS/kernel settings
//! - `access`: SSH keys
//! - `images`: boot source selections and image import
//! - `placement`: zones and tags

pub mod access;
pub mod images;
pub mod network;
pub mod placement;

use crate::config::{Baseline, BootstrapConfig};
use crate::error::BootstrapError;
use crate::layout::RackLayout;
use maas_client::MaasClientTrait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Number of objects created per kind in one baseline pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineSummary {
    pub ip_ranges: usize,
    pub ssh_keys: usize,
    pub boot_selections: usize,
    pub zones: usize,
    pub tags: usize,
}

impl BaselineSummary {
    pub fn total(&self) -> usize {
        self.ip_ranges + self.ssh_keys + self.boot_selections + self.zones + self.tags
    }
}

/// Brings the MAAS region to the desired baseline.
pub struct Reconciler {
    pub(crate) client: Arc<dyn MaasClientTrait>,
    pub(crate) layout: RackLayout,
    pub(crate) baseline: Baseline,
    pub(crate) ssh_import_id: Option<String>,
    pub(crate) ssh_public_key: PathBuf,
}

impl Reconciler {
    pub fn new(client: Arc<dyn MaasClientTrait>, config: &BootstrapConfig) -> Self {
        Self {
            client,
            layout: config.layout,
            baseline: config.baseline.clone(),
            ssh_import_id: config.ssh_import_id.clone(),
            ssh_public_key: config.ssh_public_key.clone(),
        }
    }

    /// Run every baseline step in dependency order
    ///
    /// The dynamic range has to exist before DHCP can be turned on. Zones and
    /// tags are only needed by discovery, so they go last.
    pub async fn reconcile_baseline(&self) -> Result<BaselineSummary, BootstrapError> {
        info!("Reconciling MAAS baseline for rack {}", self.layout.rack_id());

        let summary = BaselineSummary {
            ip_ranges: self.reconcile_ip_range().await?,
            ..Default::default()
        };
        self.enable_dhcp().await?;
        self.configure_region().await?;

        let summary = BaselineSummary {
            ssh_keys: self.reconcile_ssh_keys().await?,
            boot_selections: self.reconcile_boot_selections().await?,
            zones: self.reconcile_zones().await?,
            tags: self.reconcile_tags().await?,
            ..summary
        };

        info!(
            "Baseline reconciled: created {} object(s) ({} IP range, {} SSH key, {} boot selection, {} zone, {} tag)",
            summary.total(),
            summary.ip_ranges,
            summary.ssh_keys,
            summary.boot_selections,
            summary.zones,
            summary.tags
        );
        Ok(summary)
    }
}
