//! Host-backed probes
//!
//! Runs `ping` and `ip neighbor` as child processes. Every invocation is
//! bounded by a timeout and the child is killed if the timeout fires.

use crate::error::ProbeError;
use crate::models::parse_neighbor_entry;
use macaddr::MacAddr6;
use std::net::Ipv4Addr;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Liveness and neighbor-table probes
#[async_trait::async_trait]
pub trait ProbeService: Send + Sync {
    /// Send one ICMP echo to `target` (an address or a host name)
    ///
    /// `Ok(false)` means no reply (or the name did not resolve); errors are
    /// reserved for failures to run the probe at all.
    async fn ping(&self, target: &str) -> Result<bool, ProbeError>;

    /// Look up the hardware address of `address` in the neighbor table
    async fn resolve_neighbor(&self, address: Ipv4Addr) -> Result<MacAddr6, ProbeError>;
}

/// Probe implementation using the host's `ping` and `ip` binaries
#[derive(Debug, Clone)]
pub struct SystemProbe {
    timeout: Duration,
}

impl SystemProbe {
    /// Create a probe whose every command is bounded by `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<Output, ProbeError> {
        let command = format!("{} {}", program, args.join(" "));
        debug!("Running {}", command);

        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        // ping's own -W bounds the reply wait, the outer timeout covers hangs
        let limit = self.timeout + Duration::from_secs(1);
        match tokio::time::timeout(limit, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(ProbeError::Spawn { command, source }),
            Err(_) => Err(ProbeError::Timeout {
                command,
                seconds: limit.as_secs(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl ProbeService for SystemProbe {
    async fn ping(&self, target: &str) -> Result<bool, ProbeError> {
        let wait = self.timeout.as_secs().max(1).to_string();
        let output = self.run("ping", &["-c", "1", "-W", &wait, target]).await?;

        match output.status.code() {
            Some(0) => Ok(true),
            // 1: no reply, 2: other error such as an unresolvable name
            Some(1) | Some(2) => {
                debug!("No reply from {}", target);
                Ok(false)
            }
            code => Err(ProbeError::Command {
                command: format!("ping {}", target),
                status: code.unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    async fn resolve_neighbor(&self, address: Ipv4Addr) -> Result<MacAddr6, ProbeError> {
        let address = address.to_string();
        let output = self.run("ip", &["neighbor", "show", &address]).await?;

        if !output.status.success() {
            return Err(ProbeError::Command {
                command: format!("ip neighbor show {}", address),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_neighbor_entry(&String::from_utf8_lossy(&output.stdout), &address)
    }
}
