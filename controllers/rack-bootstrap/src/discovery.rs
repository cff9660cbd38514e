//! Node discovery
//!
//! Every slot in the rack runs the same workflow concurrently:
//!
//! ```text
//! probe AMT address -> resolve MAC -> find or enlist machine
//!     -> configure AMT power -> add tags -> assign zone -> save
//! ```
//!
//! A slot that fails any step is skipped with a reason and never affects the
//! other slots. All slots share one read-only snapshot of the inventory taken
//! before the fan-out.

use crate::config::{Baseline, BootstrapConfig};
use crate::error::BootstrapError;
use crate::layout::{RackLayout, zone_index};
use maas_client::{Machine, MaasClientTrait, MachineSpec, POWER_TYPE_AMT, PowerParameters, Tag, Zone};
use net_probe::{MacAddr6, ProbeService};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Why a slot was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("unreachable")]
    Unreachable,

    #[error("no neighbor entry")]
    NoNeighborEntry,

    #[error("registration failed: {0}")]
    Registration(String),

    #[error("power configuration failed: {0}")]
    PowerConfiguration(String),

    #[error("tag assignment failed: {0}")]
    TagAssignment(String),

    #[error("zone assignment failed: {0}")]
    ZoneAssignment(String),

    #[error("task aborted")]
    TaskAborted,
}

/// Final state of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    Done {
        slot: u8,
        hostname: String,
        system_id: String,
        /// false when an existing machine with the hostname was reused
        created: bool,
    },
    Skipped {
        slot: u8,
        hostname: String,
        reason: SkipReason,
    },
}

impl SlotOutcome {
    pub fn slot(&self) -> u8 {
        match self {
            SlotOutcome::Done { slot, .. } | SlotOutcome::Skipped { slot, .. } => *slot,
        }
    }

    pub fn hostname(&self) -> &str {
        match self {
            SlotOutcome::Done { hostname, .. } | SlotOutcome::Skipped { hostname, .. } => hostname,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, SlotOutcome::Done { .. })
    }
}

/// Outcomes of a discovery pass, one per slot, ordered by slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub outcomes: Vec<SlotOutcome>,
}

impl DiscoveryReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SlotOutcome::Done { created: true, .. }))
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SlotOutcome> {
        self.outcomes.iter().filter(|o| !o.is_done())
    }

    pub fn log_summary(&self) {
        info!(
            "Discovery finished: {} of {} slots succeeded ({} newly enlisted)",
            self.succeeded(),
            self.outcomes.len(),
            self.created()
        );
        for outcome in self.skipped() {
            if let SlotOutcome::Skipped { reason, .. } = outcome {
                warn!("  slot {} ({}) skipped: {}", outcome.slot(), outcome.hostname(), reason);
            }
        }
    }
}

#[cfg(test)]
impl DiscoveryReport {
    pub fn outcome(&self, slot: u8) -> Option<&SlotOutcome> {
        self.outcomes.iter().find(|o| o.slot() == slot)
    }
}

/// Inventory state read once before the fan-out
///
/// `zones` follows the baseline zone order so slot buckets map onto it by index.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySnapshot {
    pub machines: Vec<Machine>,
    pub zones: Vec<Zone>,
    pub tags: Vec<Tag>,
}

impl DiscoverySnapshot {
    pub async fn fetch(client: &dyn MaasClientTrait, baseline: &Baseline) -> Result<Self, BootstrapError> {
        let machines = client.list_machines().await?;

        let mut zones = Vec::with_capacity(baseline.zones.len());
        for spec in &baseline.zones {
            zones.push(client.get_zone(&spec.name).await?);
        }

        let mut tags = Vec::with_capacity(baseline.tags.len());
        for spec in &baseline.tags {
            tags.push(client.get_tag(&spec.name).await?);
        }

        debug!(
            "Snapshot: {} machine(s), {} zone(s), {} tag(s)",
            machines.len(),
            zones.len(),
            tags.len()
        );
        Ok(Self { machines, zones, tags })
    }

    pub fn machine(&self, hostname: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.hostname == hostname)
    }
}

/// Per-rack discovery parameters
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub slots: u8,
    pub zone_bucket_size: u8,
    pub architecture: String,
    pub power_pass: String,
}

impl DiscoverySettings {
    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            slots: config.slots,
            zone_bucket_size: config.zone_bucket_size,
            architecture: config.architecture.clone(),
            power_pass: config.power_pass.clone(),
        }
    }
}

/// Discovers, enlists and places every node of a rack.
pub struct NodeDiscovery {
    client: Arc<dyn MaasClientTrait>,
    probe: Arc<dyn ProbeService>,
    layout: RackLayout,
    settings: Arc<DiscoverySettings>,
}

impl NodeDiscovery {
    pub fn new(
        client: Arc<dyn MaasClientTrait>,
        probe: Arc<dyn ProbeService>,
        layout: RackLayout,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            client,
            probe,
            layout,
            settings: Arc::new(settings),
        }
    }

    /// Run the slot workflow for every slot concurrently
    ///
    /// Always returns one outcome per slot. A task that panics is reported as
    /// skipped with `SkipReason::TaskAborted`.
    pub async fn run(&self, snapshot: DiscoverySnapshot) -> DiscoveryReport {
        let snapshot = Arc::new(snapshot);
        let slots = 1..=self.settings.slots;
        info!("Discovering {} slot(s) in rack {}", self.settings.slots, self.layout.rack_id());

        let mut outcomes = Vec::with_capacity(usize::from(self.settings.slots));
        let mut tasks = JoinSet::new();
        for slot in slots.clone() {
            let hostname = self.layout.hostname(slot);
            let Some(address) = self.layout.management_address(slot) else {
                warn!("{} has no management address in {}", hostname, self.layout.subnet_cidr());
                outcomes.push(SlotOutcome::Skipped {
                    slot,
                    hostname,
                    reason: SkipReason::Unreachable,
                });
                continue;
            };
            let workflow = SlotWorkflow {
                slot,
                hostname,
                address,
                client: Arc::clone(&self.client),
                probe: Arc::clone(&self.probe),
                snapshot: Arc::clone(&snapshot),
                settings: Arc::clone(&self.settings),
            };
            let span = info_span!("slot", slot, hostname = %workflow.hostname);
            tasks.spawn(workflow.run().instrument(span));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Discovery task failed: {}", e),
            }
        }

        let reported: HashSet<u8> = outcomes.iter().map(SlotOutcome::slot).collect();
        for slot in slots.filter(|s| !reported.contains(s)) {
            outcomes.push(SlotOutcome::Skipped {
                slot,
                hostname: self.layout.hostname(slot),
                reason: SkipReason::TaskAborted,
            });
        }

        outcomes.sort_by_key(SlotOutcome::slot);
        DiscoveryReport { outcomes }
    }
}

/// Everything one slot task needs, owned so the task is `'static`
struct SlotWorkflow {
    slot: u8,
    hostname: String,
    address: Ipv4Addr,
    client: Arc<dyn MaasClientTrait>,
    probe: Arc<dyn ProbeService>,
    snapshot: Arc<DiscoverySnapshot>,
    settings: Arc<DiscoverySettings>,
}

impl SlotWorkflow {
    async fn run(self) -> SlotOutcome {
        match self.execute().await {
            Ok((machine, created)) => {
                info!(
                    "{} {} as {}",
                    self.hostname,
                    if created { "enlisted" } else { "updated" },
                    machine.system_id
                );
                SlotOutcome::Done {
                    slot: self.slot,
                    hostname: self.hostname,
                    system_id: machine.system_id,
                    created,
                }
            }
            Err(reason) => {
                warn!("Skipping {}: {}", self.hostname, reason);
                SlotOutcome::Skipped {
                    slot: self.slot,
                    hostname: self.hostname,
                    reason,
                }
            }
        }
    }

    async fn execute(&self) -> Result<(Machine, bool), SkipReason> {
        self.probe_live().await?;
        let mac = self.resolve_mac().await?;
        let (mut machine, created) = self.find_or_enlist(&mac).await?;
        self.configure_power(&mut machine).await?;
        self.assign_tags(&mut machine).await?;
        self.assign_zone(&mut machine)?;

        let saved = self
            .client
            .save_machine(&machine)
            .await
            .map_err(|e| SkipReason::ZoneAssignment(e.to_string()))?;
        Ok((saved, created))
    }

    async fn probe_live(&self) -> Result<(), SkipReason> {
        match self.probe.ping(&self.address.to_string()).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SkipReason::Unreachable),
            Err(e) => {
                warn!("Could not probe {}: {}", self.address, e);
                Err(SkipReason::Unreachable)
            }
        }
    }

    async fn resolve_mac(&self) -> Result<MacAddr6, SkipReason> {
        self.probe.resolve_neighbor(self.address).await.map_err(|e| {
            debug!("Neighbor lookup for {} failed: {}", self.address, e);
            SkipReason::NoNeighborEntry
        })
    }

    fn power_parameters(&self) -> PowerParameters {
        PowerParameters {
            power_address: self.address.to_string(),
            power_pass: self.settings.power_pass.clone(),
        }
    }

    /// Reuse the machine registered under this slot's hostname, or enlist one
    async fn find_or_enlist(&self, mac: &MacAddr6) -> Result<(Machine, bool), SkipReason> {
        if let Some(existing) = self.snapshot.machine(&self.hostname) {
            debug!("Reusing {} ({})", self.hostname, existing.system_id);
            let known = existing
                .mac_addresses()
                .into_iter()
                .filter_map(|m| m.parse::<MacAddr6>().ok())
                .any(|m| m == *mac);
            if !known {
                debug!("{} has no interface with MAC {}", self.hostname, mac);
            }
            return Ok((existing.clone(), false));
        }

        let spec = MachineSpec {
            hostname: self.hostname.clone(),
            architecture: self.settings.architecture.clone(),
            mac_addresses: vec![mac.to_string()],
            power_type: POWER_TYPE_AMT.to_string(),
            power_parameters: self.power_parameters(),
        };
        info!("Enlisting {} with MAC {}", self.hostname, mac);
        let machine = self
            .client
            .create_machine(&spec)
            .await
            .map_err(|e| SkipReason::Registration(e.to_string()))?;
        Ok((machine, true))
    }

    async fn configure_power(&self, machine: &mut Machine) -> Result<(), SkipReason> {
        self.client
            .set_power(&machine.system_id, POWER_TYPE_AMT, &self.power_parameters())
            .await
            .map_err(|e| SkipReason::PowerConfiguration(e.to_string()))?;
        machine.power_type = POWER_TYPE_AMT.to_string();
        Ok(())
    }

    async fn assign_tags(&self, machine: &mut Machine) -> Result<(), SkipReason> {
        for tag in &self.snapshot.tags {
            self.client
                .add_tag(&tag.name, &machine.system_id)
                .await
                .map_err(|e| SkipReason::TagAssignment(format!("{}: {}", tag.name, e)))?;
            machine.tag_names.insert(tag.name.clone());
        }
        Ok(())
    }

    fn assign_zone(&self, machine: &mut Machine) -> Result<(), SkipReason> {
        let index = zone_index(self.slot, self.settings.zone_bucket_size);
        let zone = self.snapshot.zones.get(index).ok_or_else(|| {
            SkipReason::ZoneAssignment(format!(
                "no zone for bucket {} ({} zone(s) known)",
                index + 1,
                self.snapshot.zones.len()
            ))
        })?;
        machine.zone = Some(zone.to_ref());
        Ok(())
    }
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod discovery_test;
