//! Configuration
//!
//! Command line flags (each with an environment fallback) resolve into a
//! `BootstrapConfig`. The desired baseline defaults to the standard rack
//! layout and can be replaced from a YAML file.

use crate::error::BootstrapError;
use crate::layout::{RackLayout, rack_id_from_hostname, zone_count};
use crate::readiness::PollPolicy;
use clap::Parser;
use maas_client::{TagSpec, ZoneSpec};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Command line interface
#[derive(Debug, Clone, Parser)]
#[command(name = "rack-bootstrap")]
#[command(about = "Bring a rack of AMT-managed machines under MAAS", long_about = None)]
pub struct Cli {
    /// Rack number; derived from the trailing digits of the host name if omitted
    #[arg(long, env = "RACK_ID")]
    pub rack_id: Option<u8>,

    /// MAAS region URL (default: http://172.27.<rack>.1:5240/MAAS/)
    #[arg(long, env = "MAAS_URL")]
    pub maas_url: Option<String>,

    /// MAAS API key (consumer:token:secret)
    #[arg(long, env = "MAAS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Launchpad or GitHub id to import SSH keys from
    #[arg(long = "ssh-key", env = "SSH_IMPORT_ID", default_value = "lp:knkski")]
    pub ssh_import_id: String,

    /// Local public key to authorize alongside the imported ones
    #[arg(long, env = "SSH_PUBLIC_KEY", default_value = "/home/ubuntu/.ssh/id_rsa.pub")]
    pub ssh_public_key: PathBuf,

    /// AMT password shared by every node in the rack
    #[arg(long, env = "AMT_POWER_PASS", default_value = "Password1+", hide_env_values = true)]
    pub power_pass: String,

    /// YAML file overriding the desired zones, tags and boot images
    #[arg(long, env = "BASELINE_FILE")]
    pub baseline: Option<PathBuf>,

    /// Number of node slots in the rack
    #[arg(long, default_value_t = 10)]
    pub slots: u8,

    /// Slots per availability zone
    #[arg(long, default_value_t = 6)]
    pub zone_bucket_size: u8,

    /// Architecture to enlist machines with
    #[arg(long, default_value = "amd64/generic")]
    pub architecture: String,

    /// Host pinged to decide the network is up
    #[arg(long, default_value = "8.8.8.8")]
    pub network_probe: String,

    /// Host name pinged to decide DNS works
    #[arg(long, default_value = "launchpad.net")]
    pub dns_probe: String,

    /// Seconds between network and DNS readiness probes
    #[arg(long, default_value_t = 1)]
    pub readiness_interval: u64,

    /// Network and DNS probes before giving up
    #[arg(long, default_value_t = 60)]
    pub readiness_attempts: u32,

    /// Seconds between boot image import status polls
    #[arg(long, default_value_t = 15)]
    pub import_poll_interval: u64,

    /// Timeout in seconds for each MAAS request
    #[arg(long, default_value_t = 30)]
    pub request_timeout: u64,

    /// Timeout in seconds for each ping or neighbor lookup
    #[arg(long, default_value_t = 2)]
    pub probe_timeout: u64,

    /// Skip the network and DNS readiness waits
    #[arg(long)]
    pub skip_network_wait: bool,

    /// Skip baseline reconciliation and image import
    #[arg(long)]
    pub skip_baseline: bool,

    /// Skip node discovery
    #[arg(long)]
    pub skip_discovery: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// A boot image stream that should be selected for import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootImage {
    #[serde(default = "default_os")]
    pub os: String,
    pub release: String,
    #[serde(default = "default_arches")]
    pub arches: Vec<String>,
    #[serde(default = "wildcard")]
    pub subarches: Vec<String>,
    #[serde(default = "wildcard")]
    pub labels: Vec<String>,
}

fn default_os() -> String {
    "ubuntu".to_string()
}

fn default_arches() -> Vec<String> {
    vec!["amd64".to_string()]
}

fn wildcard() -> Vec<String> {
    vec!["*".to_string()]
}

impl BootImage {
    pub fn ubuntu(release: &str) -> Self {
        Self {
            os: default_os(),
            release: release.to_string(),
            arches: default_arches(),
            subarches: wildcard(),
            labels: wildcard(),
        }
    }
}

/// Inclusive span of IPv4 addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpan {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

/// Desired baseline objects
///
/// Zone order matters: slot buckets map onto zones by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub zones: Vec<ZoneSpec>,
    pub tags: Vec<TagSpec>,
    pub boot_images: Vec<BootImage>,
    /// Dynamic DHCP range; derived from the rack layout when absent
    #[serde(default)]
    pub dynamic_range: Option<AddressSpan>,
}

impl Baseline {
    /// Standard layout: one zone per bucket of slots, the two machine tags,
    /// Ubuntu focal and bionic images
    pub fn standard(slots: u8, bucket_size: u8) -> Self {
        let zones = (0..zone_count(slots, bucket_size))
            .map(|index| {
                let first = index * usize::from(bucket_size) + 1;
                let last = ((index + 1) * usize::from(bucket_size)).min(usize::from(slots));
                ZoneSpec {
                    name: format!("zone{}", index + 1),
                    description: format!("Physical machines {}-{}", first, last),
                }
            })
            .collect();

        let tags = ["physical", "use-fastpath-installer"]
            .into_iter()
            .map(|name| TagSpec {
                name: name.to_string(),
                comment: None,
            })
            .collect();

        Self {
            zones,
            tags,
            boot_images: vec![BootImage::ubuntu("focal"), BootImage::ubuntu("bionic")],
            dynamic_range: None,
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, BootstrapError> {
        serde_yaml::from_str(contents)
            .map_err(|e| BootstrapError::InvalidConfig(format!("invalid baseline document: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, BootstrapError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub layout: RackLayout,
    pub maas_url: String,
    pub api_key: String,
    pub ssh_import_id: Option<String>,
    pub ssh_public_key: PathBuf,
    pub power_pass: String,
    pub baseline: Baseline,
    pub slots: u8,
    pub zone_bucket_size: u8,
    pub architecture: String,
    pub network_probe: String,
    pub dns_probe: String,
    pub readiness: PollPolicy,
    pub import_poll: PollPolicy,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub skip_network_wait: bool,
    pub skip_baseline: bool,
    pub skip_discovery: bool,
}

impl BootstrapConfig {
    /// Resolve flags into a configuration
    ///
    /// `hostname` is only consulted when no rack id was given.
    pub fn from_cli(cli: Cli, hostname: Option<&str>) -> Result<Self, BootstrapError> {
        let rack_id = match cli.rack_id {
            Some(id) => id,
            None => hostname.and_then(rack_id_from_hostname).ok_or_else(|| {
                BootstrapError::InvalidConfig(
                    "--rack-id not given and the host name carries no rack number".to_string(),
                )
            })?,
        };
        let layout = RackLayout::new(rack_id)?;
        if rack_id % 4 != 0 {
            warn!("Rack id {} is not a multiple of 4, its /23 may overlap a neighbour", rack_id);
        }

        if cli.slots == 0 {
            return Err(BootstrapError::InvalidConfig("--slots must be at least 1".to_string()));
        }
        if layout.management_address(cli.slots).is_none() {
            return Err(BootstrapError::InvalidConfig(format!(
                "{} slots do not fit in the management subnet",
                cli.slots
            )));
        }
        if cli.zone_bucket_size == 0 {
            return Err(BootstrapError::InvalidConfig(
                "--zone-bucket-size must be at least 1".to_string(),
            ));
        }
        if cli.readiness_attempts == 0 {
            return Err(BootstrapError::InvalidConfig(
                "--readiness-attempts must be at least 1".to_string(),
            ));
        }

        let baseline = match &cli.baseline {
            Some(path) => {
                info!("Loading baseline from {}", path.display());
                Baseline::load(path)?
            }
            None => Baseline::standard(cli.slots, cli.zone_bucket_size),
        };
        let needed = zone_count(cli.slots, cli.zone_bucket_size);
        if baseline.zones.len() < needed {
            return Err(BootstrapError::InvalidConfig(format!(
                "{} slots in buckets of {} need {} zones, baseline defines {}",
                cli.slots,
                cli.zone_bucket_size,
                needed,
                baseline.zones.len()
            )));
        }
        if let Some(span) = baseline.dynamic_range {
            if span.start > span.end {
                return Err(BootstrapError::InvalidConfig(format!(
                    "dynamic range {}-{} ends before it starts",
                    span.start, span.end
                )));
            }
        }

        let ssh_import_id = Some(cli.ssh_import_id.trim().to_string()).filter(|id| !id.is_empty());

        Ok(Self {
            maas_url: cli.maas_url.unwrap_or_else(|| layout.maas_url()),
            layout,
            api_key: cli.api_key,
            ssh_import_id,
            ssh_public_key: cli.ssh_public_key,
            power_pass: cli.power_pass,
            baseline,
            slots: cli.slots,
            zone_bucket_size: cli.zone_bucket_size,
            architecture: cli.architecture,
            network_probe: cli.network_probe,
            dns_probe: cli.dns_probe,
            readiness: PollPolicy::bounded(
                Duration::from_secs(cli.readiness_interval),
                cli.readiness_attempts,
            ),
            import_poll: PollPolicy::unbounded(Duration::from_secs(cli.import_poll_interval)),
            request_timeout: Duration::from_secs(cli.request_timeout),
            probe_timeout: Duration::from_secs(cli.probe_timeout),
            skip_network_wait: cli.skip_network_wait,
            skip_baseline: cli.skip_baseline,
            skip_discovery: cli.skip_discovery,
        })
    }
}

/// Host name of the machine we run on, if it can be determined
pub fn local_hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
