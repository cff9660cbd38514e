//! Readiness polling
//!
//! Blocks until an external condition holds: outbound network, DNS, or the
//! end of a boot image import.

use crate::error::BootstrapError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// How often and how many times to evaluate a readiness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the check succeeds
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::bounded(Duration::from_secs(1), 60)
    }
}

/// Evaluate `check` until it returns true
///
/// The interval is slept between failed attempts only, never after the last
/// one. Returns the number of attempts made on success, or
/// `BootstrapError::ReadinessTimeout` once a bounded policy runs out.
pub async fn wait_until<F, Fut>(what: &str, policy: PollPolicy, mut check: F) -> Result<u32, BootstrapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if check().await {
            debug!("{} ready after {} attempt(s)", what, attempt);
            return Ok(attempt);
        }

        match policy.max_attempts {
            Some(max) if attempt >= max => {
                return Err(BootstrapError::ReadinessTimeout {
                    what: what.to_string(),
                    attempts: attempt,
                });
            }
            Some(max) => info!(" - Still waiting for {} ({}/{})", what, attempt, max),
            None => info!(" - Still waiting for {} (attempt {})", what, attempt),
        }

        tokio::time::sleep(policy.interval).await;
    }
}
