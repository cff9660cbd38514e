//! Network reconcilers
//!
//! Handles: dynamic IP range, DHCP on the rack VLAN, region DNS and kernel settings

use super::Reconciler;
use crate::error::BootstrapError;
use crate::reconcile_helpers::reconcile;
use maas_client::{IpRangeSpec, IpRangeType};
use tracing::{debug, info, warn};

impl Reconciler {
    /// Ensure a dynamic range exists
    ///
    /// Any existing range counts, whatever its bounds.
    pub async fn reconcile_ip_range(&self) -> Result<usize, BootstrapError> {
        let (start, end) = match self.baseline.dynamic_range {
            Some(span) => (span.start, span.end),
            None => self.layout.dynamic_range(),
        };
        let desired = [IpRangeSpec {
            range_type: IpRangeType::Dynamic,
            start_ip: start.to_string(),
            end_ip: end.to_string(),
            comment: Some(format!("Dynamic range for rack {}", self.layout.rack_id())),
        }];

        let existing = self.client.list_ip_ranges().await?;
        let client = &*self.client;
        let created = reconcile("IP range", &existing, &desired, move |spec| async move {
            client.create_ip_range(&spec).await
        })
        .await?;
        Ok(created.len())
    }

    /// Serve DHCP on the VLAN of the rack subnet, with the first rack
    /// controller as primary
    ///
    /// Returns whether the VLAN was changed. A missing rack controller or
    /// subnet is logged and left alone.
    pub async fn enable_dhcp(&self) -> Result<bool, BootstrapError> {
        let racks = self.client.list_rack_controllers().await?;
        let Some(primary) = racks.first() else {
            warn!("No rack controller registered, leaving DHCP off");
            return Ok(false);
        };

        let cidr = self.layout.subnet_cidr();
        let subnets = self.client.list_subnets().await?;
        let Some(subnet) = subnets.iter().find(|s| s.cidr == cidr) else {
            warn!("Subnet {} not known to MAAS, leaving DHCP off", cidr);
            return Ok(false);
        };

        let vlan = &subnet.vlan;
        if vlan.dhcp_on && vlan.primary_rack.as_deref() == Some(primary.system_id.as_str()) {
            debug!("DHCP already enabled on VLAN {} of {}", vlan.vid, cidr);
            return Ok(false);
        }

        info!(
            "Enabling DHCP on VLAN {} (fabric {}) of {} with primary rack {}",
            vlan.vid, vlan.fabric_id, cidr, primary.hostname
        );
        self.client.enable_dhcp(vlan, &primary.system_id).await?;
        Ok(true)
    }

    /// Point the region at the rack's upstream resolver and set boot kernel options
    pub async fn configure_region(&self) -> Result<(), BootstrapError> {
        let settings = [
            ("upstream_dns", self.layout.upstream_dns().to_string()),
            ("dnssec_validation", "no".to_string()),
            ("kernel_opts", "net.ifnames=0".to_string()),
        ];
        for (name, value) in settings {
            info!("Setting {} = {}", name, value);
            self.client.set_config(name, &value).await?;
        }
        Ok(())
    }
}
