//! Test utilities for unit testing the bootstrap stages
//!
//! Provides a scripted probe, a seeded mock MAAS region and config fixtures.

#[cfg(test)]
use crate::config::{BootstrapConfig, Cli};
#[cfg(test)]
use crate::layout::RackLayout;
#[cfg(test)]
use clap::Parser;
#[cfg(test)]
use maas_client::*;
#[cfg(test)]
use net_probe::{MacAddr6, ProbeError, ProbeService};
#[cfg(test)]
use std::collections::{HashMap, HashSet};
#[cfg(test)]
use std::net::Ipv4Addr;
#[cfg(test)]
use std::sync::Mutex;

/// Probe with scripted answers
///
/// Every target answers pings and every address has a neighbor entry unless
/// told otherwise. MAC addresses are derived from the last two octets.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockProbe {
    down: Mutex<HashSet<String>>,
    up_after: Mutex<HashMap<String, u32>>,
    missing_neighbors: Mutex<HashSet<Ipv4Addr>>,
    pings: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never answer pings to `target`
    pub fn mark_down(&self, target: impl Into<String>) {
        self.down.lock().unwrap().insert(target.into());
    }

    /// Drop the first `failures` pings to `target`
    pub fn up_after(&self, target: impl Into<String>, failures: u32) {
        self.up_after.lock().unwrap().insert(target.into(), failures);
    }

    /// Answer pings from `address` but leave it out of the neighbor table
    pub fn drop_neighbor(&self, address: Ipv4Addr) {
        self.missing_neighbors.lock().unwrap().insert(address);
    }

    pub fn ping_count(&self, target: &str) -> usize {
        self.pings.lock().unwrap().iter().filter(|t| *t == target).count()
    }

    pub fn mac_for(address: Ipv4Addr) -> MacAddr6 {
        let [_, _, c, d] = address.octets();
        MacAddr6::new(0x00, 0x1e, 0x67, 0x00, c, d)
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl ProbeService for MockProbe {
    async fn ping(&self, target: &str) -> Result<bool, ProbeError> {
        self.pings.lock().unwrap().push(target.to_string());

        if self.down.lock().unwrap().contains(target) {
            return Ok(false);
        }
        let mut up_after = self.up_after.lock().unwrap();
        if let Some(remaining) = up_after.get_mut(target) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn resolve_neighbor(&self, address: Ipv4Addr) -> Result<MacAddr6, ProbeError> {
        if self.missing_neighbors.lock().unwrap().contains(&address) {
            return Err(ProbeError::NeighborNotFound(address.to_string()));
        }
        Ok(Self::mac_for(address))
    }
}

/// Config for rack 8 with zero poll intervals
///
/// No local public key is read unless `extra` passes `--ssh-public-key`.
#[cfg(test)]
pub fn test_config(extra: &[&str]) -> BootstrapConfig {
    let mut argv = vec![
        "rack-bootstrap",
        "--rack-id",
        "8",
        "--api-key",
        "consumer:token:secret",
        "--readiness-interval",
        "0",
        "--import-poll-interval",
        "0",
    ];
    if !extra.contains(&"--ssh-public-key") {
        argv.extend_from_slice(&["--ssh-public-key", "/nonexistent/id_rsa.pub"]);
    }
    argv.extend_from_slice(extra);
    BootstrapConfig::from_cli(Cli::try_parse_from(argv).unwrap(), None).unwrap()
}

/// A fresh region as installed: one boot source, one rack controller and
/// the rack subnet on an untagged VLAN with DHCP off
#[cfg(test)]
pub fn seeded_client(layout: &RackLayout) -> MockMaasClient {
    let client = MockMaasClient::new(layout.maas_url());
    client.add_zone(Zone {
        id: 1,
        name: "default".to_string(),
        description: String::new(),
        resource_uri: "/MAAS/api/2.0/zones/default/".to_string(),
    });
    client.add_boot_source(BootSource {
        id: 1,
        url: "http://images.maas.io/ephemeral-v3/daily/".to_string(),
        keyring_filename: "/usr/share/keyrings/ubuntu-cloudimage-keyring.gpg".to_string(),
    });
    client.add_rack_controller(RackController {
        system_id: "rack01".to_string(),
        hostname: format!("orangebox{}", layout.rack_id()),
    });
    client.add_subnet(Subnet {
        id: 1,
        cidr: layout.subnet_cidr(),
        vlan: Vlan {
            id: 5001,
            vid: 0,
            fabric_id: 0,
            dhcp_on: false,
            primary_rack: None,
            name: "untagged".to_string(),
        },
        name: layout.subnet_cidr(),
    });
    client
}

/// Add the zones and tags named by `config`'s baseline directly to the mock
#[cfg(test)]
pub fn add_placement(client: &MockMaasClient, config: &BootstrapConfig) {
    for (index, zone) in config.baseline.zones.iter().enumerate() {
        client.add_zone(Zone {
            id: 100 + index as u64,
            name: zone.name.clone(),
            description: zone.description.clone(),
            resource_uri: format!("/MAAS/api/2.0/zones/{}/", zone.name),
        });
    }
    for tag in &config.baseline.tags {
        client.add_tag_definition(Tag {
            name: tag.name.clone(),
            definition: String::new(),
            comment: String::new(),
            kernel_opts: String::new(),
            resource_uri: format!("/MAAS/api/2.0/tags/{}/", tag.name),
        });
    }
}

/// A machine already enlisted under `hostname`
#[cfg(test)]
pub fn enlisted_machine(system_id: &str, hostname: &str) -> Machine {
    Machine {
        system_id: system_id.to_string(),
        hostname: hostname.to_string(),
        architecture: "amd64/generic".to_string(),
        power_type: String::new(),
        status_name: "Ready".to_string(),
        zone: Some(ZoneRef {
            id: 1,
            name: "default".to_string(),
            description: String::new(),
        }),
        tag_names: Default::default(),
        interface_set: Vec::new(),
        resource_uri: format!("/MAAS/api/2.0/machines/{}/", system_id),
    }
}
