//! Rack topology.
//!
//! Every address and name the bootstrap touches is derived from the rack id:
//! the rack owns `172.27.{id}.0/23`, the region controller sits at `.1` of the
//! first half, AMT interfaces at `.{10 + slot}`, and the dynamic range plus the
//! upstream router live in the second half.

use crate::error::BootstrapError;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// Prefix length of a rack's management subnet
const RACK_PREFIX: u8 = 23;

/// Host indexes within the rack's /23
const CONTROLLER_INDEX: u32 = 1;
const MANAGEMENT_OFFSET: u32 = 10;
const LAST_MANAGEMENT_INDEX: u32 = 254;
const DYNAMIC_RANGE_START_INDEX: u32 = 257;
const DYNAMIC_RANGE_END_INDEX: u32 = 276;
const UPSTREAM_DNS_INDEX: u32 = 510;

/// Derived addressing for one rack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RackLayout {
    rack_id: u8,
    network: Ipv4Network,
    controller: Ipv4Addr,
    dynamic_range: (Ipv4Addr, Ipv4Addr),
    upstream_dns: Ipv4Addr,
}

impl RackLayout {
    /// Layout of the rack owning `172.27.{rack_id}.0/23`
    ///
    /// The id must be even so the /23 starts on its own network address.
    pub fn new(rack_id: u8) -> Result<Self, BootstrapError> {
        if rack_id % 2 != 0 {
            return Err(BootstrapError::InvalidConfig(format!(
                "rack id {} does not start a /{} (use an even id)",
                rack_id, RACK_PREFIX
            )));
        }
        let network = Ipv4Network::new(Ipv4Addr::new(172, 27, rack_id, 0), RACK_PREFIX)
            .map_err(|e| BootstrapError::InvalidConfig(format!("rack id {}: {}", rack_id, e)))?;
        let host = |index: u32| {
            network.nth(index).ok_or_else(|| {
                BootstrapError::InvalidConfig(format!("{} has no host {}", network, index))
            })
        };

        Ok(Self {
            rack_id,
            network,
            controller: host(CONTROLLER_INDEX)?,
            dynamic_range: (host(DYNAMIC_RANGE_START_INDEX)?, host(DYNAMIC_RANGE_END_INDEX)?),
            upstream_dns: host(UPSTREAM_DNS_INDEX)?,
        })
    }

    pub fn rack_id(&self) -> u8 {
        self.rack_id
    }

    /// The rack's management subnet
    pub fn network(&self) -> Ipv4Network {
        self.network
    }

    /// CIDR of the subnet MAAS serves DHCP on
    pub fn subnet_cidr(&self) -> String {
        self.network.to_string()
    }

    /// Address of the region/rack controller
    pub fn controller_address(&self) -> Ipv4Addr {
        self.controller
    }

    /// Default MAAS region URL for this rack
    pub fn maas_url(&self) -> String {
        format!("http://{}:5240/MAAS/", self.controller)
    }

    /// Out-of-band management address of a slot: `.{10 + slot}` of the first half
    ///
    /// `None` once the slot would run past the first half's last host.
    pub fn management_address(&self, slot: u8) -> Option<Ipv4Addr> {
        let index = MANAGEMENT_OFFSET + u32::from(slot);
        if index > LAST_MANAGEMENT_INDEX {
            return None;
        }
        self.network.nth(index)
    }

    /// Inventory hostname of a slot, e.g. `node05ob8`
    pub fn hostname(&self, slot: u8) -> String {
        format!("node{:02}ob{}", slot, self.rack_id)
    }

    /// First and last address of the DHCP dynamic range, `.1` to `.20` of the second half
    pub fn dynamic_range(&self) -> (Ipv4Addr, Ipv4Addr) {
        self.dynamic_range
    }

    /// Upstream DNS resolver (the rack's router, `.254` of the second half)
    pub fn upstream_dns(&self) -> Ipv4Addr {
        self.upstream_dns
    }
}

/// Index of the zone a slot belongs to when slots are split into buckets
///
/// Slots are numbered from 1, so slots `1..=bucket_size` map to zone 0.
pub fn zone_index(slot: u8, bucket_size: u8) -> usize {
    usize::from(slot.saturating_sub(1)) / usize::from(bucket_size.max(1))
}

/// Number of zones needed to cover `slots` slots
pub fn zone_count(slots: u8, bucket_size: u8) -> usize {
    if slots == 0 {
        return 0;
    }
    zone_index(slots, bucket_size) + 1
}

/// Parse the rack id from a host name ending in digits (`OrangeBox8` -> 8)
pub fn rack_id_from_hostname(hostname: &str) -> Option<u8> {
    let trimmed = hostname.trim();
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[digits_start..].parse().ok()
}
