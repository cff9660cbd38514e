//! MaasClient trait for mocking
//!
//! This trait abstracts the MaasClient so the bootstrap components can be
//! exercised in unit tests. The concrete MaasClient implements this trait,
//! and tests use `MockMaasClient`.

use crate::error::MaasError;
use crate::models::*;

/// Trait for MAAS API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime,
/// and implementations must be safe to share between concurrently running
/// discovery tasks.
#[async_trait::async_trait]
pub trait MaasClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API key
    async fn validate_credentials(&self) -> Result<(), MaasError>;

    // Machines
    async fn list_machines(&self) -> Result<Vec<Machine>, MaasError>;
    async fn create_machine(&self, spec: &MachineSpec) -> Result<Machine, MaasError>;
    async fn set_power(&self, system_id: &str, power_type: &str, params: &PowerParameters) -> Result<(), MaasError>;
    async fn add_tag(&self, tag: &str, system_id: &str) -> Result<(), MaasError>;
    /// Persist the mutable placement of a machine (its zone)
    async fn save_machine(&self, machine: &Machine) -> Result<Machine, MaasError>;

    // Zones
    async fn list_zones(&self) -> Result<Vec<Zone>, MaasError>;
    async fn get_zone(&self, name: &str) -> Result<Zone, MaasError>;
    async fn create_zone(&self, spec: &ZoneSpec) -> Result<Zone, MaasError>;

    // Tags
    async fn list_tags(&self) -> Result<Vec<Tag>, MaasError>;
    async fn get_tag(&self, name: &str) -> Result<Tag, MaasError>;
    async fn create_tag(&self, spec: &TagSpec) -> Result<Tag, MaasError>;

    // Boot sources and images
    async fn list_boot_sources(&self) -> Result<Vec<BootSource>, MaasError>;
    async fn list_boot_source_selections(&self, boot_source_id: u64) -> Result<Vec<BootSourceSelection>, MaasError>;
    async fn create_boot_source_selection(&self, spec: &BootSourceSelectionSpec) -> Result<BootSourceSelection, MaasError>;
    async fn start_import(&self) -> Result<(), MaasError>;
    async fn is_importing(&self) -> Result<bool, MaasError>;

    // SSH keys
    async fn list_ssh_keys(&self) -> Result<Vec<SshKey>, MaasError>;
    async fn create_ssh_key(&self, spec: &SshKeySpec) -> Result<SshKey, MaasError>;
    /// Import keys from a key source such as `lp:user` or `gh:user`
    async fn import_ssh_keys(&self, keysource: &str) -> Result<Vec<SshKey>, MaasError>;

    // Networking
    async fn list_ip_ranges(&self) -> Result<Vec<IpRange>, MaasError>;
    async fn create_ip_range(&self, spec: &IpRangeSpec) -> Result<IpRange, MaasError>;
    async fn list_rack_controllers(&self) -> Result<Vec<RackController>, MaasError>;
    async fn list_subnets(&self) -> Result<Vec<Subnet>, MaasError>;
    async fn enable_dhcp(&self, vlan: &Vlan, primary_rack: &str) -> Result<Vlan, MaasError>;

    // Region configuration
    async fn set_config(&self, name: &str, value: &str) -> Result<(), MaasError>;
}
