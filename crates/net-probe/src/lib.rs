//! Network Probes
//!
//! Liveness and address-resolution probes used to discover machines through
//! their out-of-band management interfaces.
//!
//! `SystemProbe` shells out to `ping` and `ip neighbor` on the host; anything
//! implementing `ProbeService` can stand in for it (tests use a scripted probe).

pub mod error;
pub mod models;
pub mod system;

pub use error::ProbeError;
pub use macaddr::MacAddr6;
pub use models::parse_neighbor_entry;
pub use system::{ProbeService, SystemProbe};
