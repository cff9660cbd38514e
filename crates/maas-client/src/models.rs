//! MAAS API models
//!
//! These models match the JSON emitted by the MAAS 2.0 REST API handlers.
//! Fields the bootstrap never reads are left out; everything optional on the
//! server side carries `#[serde(default)]` so older MAAS releases still parse.
//!
//! The `*Spec` types are the request side: typed records describing an object
//! the caller wants to exist. They are turned into form fields by the client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Power type used for Intel AMT out-of-band management
pub const POWER_TYPE_AMT: &str = "amt";

/// Machine model matching the MAAS machine handler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Machine {
    pub system_id: String,
    pub hostname: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub power_type: String,
    #[serde(default)]
    pub status_name: String,
    pub zone: Option<ZoneRef>,
    #[serde(default)]
    pub tag_names: BTreeSet<String>,
    #[serde(default)]
    pub interface_set: Vec<InterfaceRef>,
    #[serde(default)]
    pub resource_uri: String,
}

impl Machine {
    /// MAC addresses of every interface known for this machine
    pub fn mac_addresses(&self) -> Vec<&str> {
        self.interface_set
            .iter()
            .filter_map(|iface| iface.mac_address.as_deref())
            .collect()
    }

    /// Name of the zone the machine is currently assigned to
    pub fn zone_name(&self) -> Option<&str> {
        self.zone.as_ref().map(|z| z.name.as_str())
    }
}

/// Zone reference nested inside a machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneRef {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Interface reference nested inside a machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceRef {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub mac_address: Option<String>,
}

/// Physical zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource_uri: String,
}

impl Zone {
    /// Reference form of this zone, as stored on a machine
    pub fn to_ref(&self) -> ZoneRef {
        ZoneRef {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Machine tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub kernel_opts: String,
    #[serde(default)]
    pub resource_uri: String,
}

/// Upstream image source (e.g. images.maas.io)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootSource {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub keyring_filename: String,
}

/// Image selection within a boot source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootSourceSelection {
    pub id: u64,
    pub os: String,
    pub release: String,
    #[serde(default)]
    pub arches: Vec<String>,
    #[serde(default)]
    pub subarches: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub boot_source_id: u64,
}

/// Authorized SSH public key of the API user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshKey {
    pub id: u64,
    pub key: String,
    pub keysource: Option<String>,
}

/// IP range type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IpRangeType {
    Dynamic,
    Reserved,
}

impl IpRangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            IpRangeType::Dynamic => "dynamic",
            IpRangeType::Reserved => "reserved",
        }
    }
}

/// DHCP-assignable or reserved address span
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpRange {
    pub id: u64,
    #[serde(rename = "type")]
    pub range_type: IpRangeType,
    pub start_ip: String,
    pub end_ip: String,
    #[serde(default)]
    pub comment: String,
}

/// Rack controller serving DHCP/TFTP for a subnet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RackController {
    pub system_id: String,
    pub hostname: String,
}

/// VLAN nested inside a subnet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vlan {
    pub id: u64,
    pub vid: u16,
    pub fabric_id: u64,
    #[serde(default)]
    pub dhcp_on: bool,
    pub primary_rack: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Subnet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subnet {
    pub id: u64,
    pub cidr: String,
    pub vlan: Vlan,
    #[serde(default)]
    pub name: String,
}

/// Power parameters for a machine using AMT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PowerParameters {
    pub power_address: String,
    pub power_pass: String,
}

impl PowerParameters {
    /// Flatten into the `power_parameters_<name>` form fields MAAS expects
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("power_parameters_power_address".to_string(), self.power_address.clone()),
            ("power_parameters_power_pass".to_string(), self.power_pass.clone()),
        ]
    }
}

/// Request for a machine that should be enlisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineSpec {
    pub hostname: String,
    pub architecture: String,
    pub mac_addresses: Vec<String>,
    pub power_type: String,
    pub power_parameters: PowerParameters,
}

/// Request for a zone that should exist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Request for a tag that should exist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagSpec {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request for a boot source selection that should exist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootSourceSelectionSpec {
    pub boot_source_id: u64,
    pub os: String,
    pub release: String,
    pub arches: Vec<String>,
    pub subarches: Vec<String>,
    pub labels: Vec<String>,
}

/// Request for an SSH key that should be authorized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshKeySpec {
    pub key: String,
}

/// Request for an IP range that should exist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpRangeSpec {
    pub range_type: IpRangeType,
    pub start_ip: String,
    pub end_ip: String,
    #[serde(default)]
    pub comment: Option<String>,
}
