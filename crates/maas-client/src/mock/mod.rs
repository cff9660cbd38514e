//! Mock MaasClient for unit testing
//!
//! This module provides an in-memory implementation of `MaasClientTrait` that
//! can be used in unit tests without a running MAAS region.
//!
//! The mock is organized into domain-specific modules:
//! - `machines.rs` - machine enlistment, power, tags and zone placement
//! - `baseline.rs` - zones, tags, boot sources, SSH keys, IP ranges, config
//!
//! Every mutating call is recorded so tests can count creates, reads are
//! counted separately, and any call can be made to fail with `fail_on`.

mod baseline;
mod machines;

use crate::error::MaasError;
use crate::maas_trait::MaasClientTrait;
use crate::models::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock MaasClient for testing
///
/// Clones share the same storage, so a test can keep a handle while the code
/// under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockMaasClient {
    pub(crate) base_url: String,
    // In-memory storage, keyed the way MAAS enforces uniqueness
    pub(crate) machines: Arc<Mutex<BTreeMap<String, Machine>>>,
    pub(crate) power: Arc<Mutex<HashMap<String, (String, PowerParameters)>>>,
    pub(crate) zones: Arc<Mutex<BTreeMap<String, Zone>>>,
    pub(crate) tags: Arc<Mutex<BTreeMap<String, Tag>>>,
    pub(crate) boot_sources: Arc<Mutex<Vec<BootSource>>>,
    pub(crate) selections: Arc<Mutex<Vec<BootSourceSelection>>>,
    pub(crate) ssh_keys: Arc<Mutex<Vec<SshKey>>>,
    pub(crate) ip_ranges: Arc<Mutex<Vec<IpRange>>>,
    pub(crate) rack_controllers: Arc<Mutex<Vec<RackController>>>,
    pub(crate) subnets: Arc<Mutex<Vec<Subnet>>>,
    pub(crate) config: Arc<Mutex<HashMap<String, String>>>,
    /// Remaining `is_importing` polls that report `true` after an import starts
    pub(crate) import_polls: Arc<Mutex<u32>>,
    pub(crate) importing: Arc<Mutex<bool>>,
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
    pub(crate) reads: Arc<Mutex<Vec<String>>>,
    pub(crate) failures: Arc<Mutex<HashSet<String>>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl MockMaasClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            next_id: Arc::new(Mutex::new(1)),
            ..Default::default()
        }
    }

    /// Add a machine to the mock store (for test setup)
    pub fn add_machine(&self, machine: Machine) {
        self.machines.lock().unwrap().insert(machine.system_id.clone(), machine);
    }

    /// Add a zone to the mock store (for test setup)
    pub fn add_zone(&self, zone: Zone) {
        self.zones.lock().unwrap().insert(zone.name.clone(), zone);
    }

    /// Add a tag to the mock store (for test setup)
    pub fn add_tag_definition(&self, tag: Tag) {
        self.tags.lock().unwrap().insert(tag.name.clone(), tag);
    }

    /// Add a boot source to the mock store (for test setup)
    pub fn add_boot_source(&self, source: BootSource) {
        self.boot_sources.lock().unwrap().push(source);
    }

    /// Add a boot source selection to the mock store (for test setup)
    pub fn add_selection(&self, selection: BootSourceSelection) {
        self.selections.lock().unwrap().push(selection);
    }

    /// Add a rack controller to the mock store (for test setup)
    pub fn add_rack_controller(&self, rack: RackController) {
        self.rack_controllers.lock().unwrap().push(rack);
    }

    /// Add a subnet to the mock store (for test setup)
    pub fn add_subnet(&self, subnet: Subnet) {
        self.subnets.lock().unwrap().push(subnet);
    }

    /// Number of `is_importing` polls that report `true` once an import starts
    pub fn set_import_duration(&self, polls: u32) {
        *self.import_polls.lock().unwrap() = polls;
    }

    /// Make an operation fail
    ///
    /// `op` is either an operation name (`"create_zone"`) which fails every
    /// call, or `"<operation>:<target>"` (`"set_power:node03ob8"`) which fails
    /// only for that hostname, system id or object name.
    pub fn fail_on(&self, op: impl Into<String>) {
        self.failures.lock().unwrap().insert(op.into());
    }

    /// Recorded mutating calls, in order, as `"<operation>:<target>"`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times an operation was invoked
    pub fn call_count(&self, op: &str) -> usize {
        let prefix = format!("{}:", op);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    /// How many times a read-only operation was invoked
    ///
    /// Reads are kept apart from `calls` so mutation assertions stay exact.
    pub fn read_count(&self, op: &str) -> usize {
        self.reads.lock().unwrap().iter().filter(|r| *r == op).count()
    }

    /// Forget recorded reads, e.g. after test setup
    pub fn clear_reads(&self) {
        self.reads.lock().unwrap().clear();
    }

    /// Power type and parameters last set for a machine
    pub fn power_of(&self, system_id: &str) -> Option<(String, PowerParameters)> {
        self.power.lock().unwrap().get(system_id).cloned()
    }

    /// Value of a region configuration key
    pub fn config_value(&self, name: &str) -> Option<String> {
        self.config.lock().unwrap().get(name).cloned()
    }

    /// Look a machine up by hostname
    pub fn machine_by_hostname(&self, hostname: &str) -> Option<Machine> {
        self.machines
            .lock()
            .unwrap()
            .values()
            .find(|m| m.hostname == hostname)
            .cloned()
    }

    /// Record a call and apply any configured failure
    pub(crate) fn record(&self, op: &str, target: &str) -> Result<(), MaasError> {
        self.calls.lock().unwrap().push(format!("{}:{}", op, target));
        let failures = self.failures.lock().unwrap();
        if failures.contains(op) || failures.contains(&format!("{}:{}", op, target)) {
            return Err(MaasError::Api(format!("injected failure for {} on {}", op, target)));
        }
        Ok(())
    }

    /// Record a read and apply any configured failure
    pub(crate) fn check_read(&self, op: &str) -> Result<(), MaasError> {
        self.reads.lock().unwrap().push(op.to_string());
        if self.failures.lock().unwrap().contains(op) {
            return Err(MaasError::Api(format!("injected failure for {}", op)));
        }
        Ok(())
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl MaasClientTrait for MockMaasClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_credentials(&self) -> Result<(), MaasError> {
        self.check_read("validate_credentials")
    }

    // Machines - delegated to machines module
    async fn list_machines(&self) -> Result<Vec<Machine>, MaasError> {
        machines::list_machines(self).await
    }

    async fn create_machine(&self, spec: &MachineSpec) -> Result<Machine, MaasError> {
        machines::create_machine(self, spec).await
    }

    async fn set_power(&self, system_id: &str, power_type: &str, params: &PowerParameters) -> Result<(), MaasError> {
        machines::set_power(self, system_id, power_type, params).await
    }

    async fn add_tag(&self, tag: &str, system_id: &str) -> Result<(), MaasError> {
        machines::add_tag(self, tag, system_id).await
    }

    async fn save_machine(&self, machine: &Machine) -> Result<Machine, MaasError> {
        machines::save_machine(self, machine).await
    }

    // Baseline objects - delegated to baseline module
    async fn list_zones(&self) -> Result<Vec<Zone>, MaasError> {
        baseline::list_zones(self).await
    }

    async fn get_zone(&self, name: &str) -> Result<Zone, MaasError> {
        baseline::get_zone(self, name).await
    }

    async fn create_zone(&self, spec: &ZoneSpec) -> Result<Zone, MaasError> {
        baseline::create_zone(self, spec).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, MaasError> {
        baseline::list_tags(self).await
    }

    async fn get_tag(&self, name: &str) -> Result<Tag, MaasError> {
        baseline::get_tag(self, name).await
    }

    async fn create_tag(&self, spec: &TagSpec) -> Result<Tag, MaasError> {
        baseline::create_tag(self, spec).await
    }

    async fn list_boot_sources(&self) -> Result<Vec<BootSource>, MaasError> {
        baseline::list_boot_sources(self).await
    }

    async fn list_boot_source_selections(&self, boot_source_id: u64) -> Result<Vec<BootSourceSelection>, MaasError> {
        baseline::list_boot_source_selections(self, boot_source_id).await
    }

    async fn create_boot_source_selection(&self, spec: &BootSourceSelectionSpec) -> Result<BootSourceSelection, MaasError> {
        baseline::create_boot_source_selection(self, spec).await
    }

    async fn start_import(&self) -> Result<(), MaasError> {
        baseline::start_import(self).await
    }

    async fn is_importing(&self) -> Result<bool, MaasError> {
        baseline::is_importing(self).await
    }

    async fn list_ssh_keys(&self) -> Result<Vec<SshKey>, MaasError> {
        baseline::list_ssh_keys(self).await
    }

    async fn create_ssh_key(&self, spec: &SshKeySpec) -> Result<SshKey, MaasError> {
        baseline::create_ssh_key(self, spec).await
    }

    async fn import_ssh_keys(&self, keysource: &str) -> Result<Vec<SshKey>, MaasError> {
        baseline::import_ssh_keys(self, keysource).await
    }

    async fn list_ip_ranges(&self) -> Result<Vec<IpRange>, MaasError> {
        baseline::list_ip_ranges(self).await
    }

    async fn create_ip_range(&self, spec: &IpRangeSpec) -> Result<IpRange, MaasError> {
        baseline::create_ip_range(self, spec).await
    }

    async fn list_rack_controllers(&self) -> Result<Vec<RackController>, MaasError> {
        baseline::list_rack_controllers(self).await
    }

    async fn list_subnets(&self) -> Result<Vec<Subnet>, MaasError> {
        baseline::list_subnets(self).await
    }

    async fn enable_dhcp(&self, vlan: &Vlan, primary_rack: &str) -> Result<Vlan, MaasError> {
        baseline::enable_dhcp(self, vlan, primary_rack).await
    }

    async fn set_config(&self, name: &str, value: &str) -> Result<(), MaasError> {
        baseline::set_config(self, name, value).await
    }
}
