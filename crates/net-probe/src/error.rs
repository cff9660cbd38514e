//! Probe errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("{command} exited with status {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("no neighbor entry for {0}")]
    NeighborNotFound(String),

    #[error("invalid MAC address {value}: {source}")]
    InvalidMac {
        value: String,
        #[source]
        source: macaddr::ParseError,
    },
}
