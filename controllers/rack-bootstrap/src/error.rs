//! Bootstrap error types.
//!
//! Errors here abort the run. Per-slot discovery failures are not errors:
//! they become `SkipReason`s in the discovery report.

use maas_client::MaasError;
use thiserror::Error;

/// Errors that can occur while bootstrapping a rack.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// MAAS API error
    #[error("MAAS error: {0}")]
    Maas(#[from] MaasError),

    /// A bounded readiness poll ran out of attempts
    #[error("Timed out waiting for {what} after {attempts} attempts")]
    ReadinessTimeout { what: String, attempts: u32 },

    /// Creating a baseline object failed
    #[error("Failed to create {kind} {key}: {source}")]
    Reconciliation {
        kind: &'static str,
        key: String,
        #[source]
        source: MaasError,
    },

    /// Something baseline reconciliation depends on is missing in MAAS
    #[error("Missing prerequisite: {0}")]
    Prerequisite(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
