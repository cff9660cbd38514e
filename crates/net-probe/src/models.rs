//! Neighbor table parsing

use crate::error::ProbeError;
use macaddr::MacAddr6;

/// Extract the link-layer address from `ip neighbor show <addr>` output
///
/// Lines look like `172.27.8.11 dev br0 lladdr aa:bb:cc:dd:ee:ff REACHABLE`.
/// Entries in FAILED or INCOMPLETE state carry no `lladdr` and are skipped.
pub fn parse_neighbor_entry(output: &str, address: &str) -> Result<MacAddr6, ProbeError> {
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(address) {
            continue;
        }
        let mut rest = tokens.skip_while(|t| *t != "lladdr");
        if rest.next().is_some() {
            if let Some(mac) = rest.next() {
                return mac.parse().map_err(|e| ProbeError::InvalidMac {
                    value: mac.to_string(),
                    source: e,
                });
            }
        }
    }
    Err(ProbeError::NeighborNotFound(address.to_string()))
}
