//! MAAS REST API Client
//!
//! A Rust client library for the MAAS 2.0 REST API, covering the calls needed
//! to bring a rack of bare-metal machines under MAAS management.
//!
//! # Example
//!
//! ```no_run
//! use maas_client::{MaasClient, MaasClientTrait, ZoneSpec, DEFAULT_TIMEOUT};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MaasClient::new(
//!     "http://172.27.8.1:5240/MAAS/".to_string(),
//!     "consumer:token:secret",
//!     DEFAULT_TIMEOUT,
//! )?;
//!
//! let zones = client.list_zones().await?;
//! if !zones.iter().any(|z| z.name == "zone1") {
//!     client.create_zone(&ZoneSpec {
//!         name: "zone1".to_string(),
//!         description: "Physical machines 1-6".to_string(),
//!     }).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Machines**: enlist, power configuration, tagging, zone placement
//! - **Baseline objects**: zones, tags, boot source selections, SSH keys, IP ranges
//! - **Image import**: trigger and poll boot resource imports
//! - **Mocking**: `MockMaasClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod maas_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{MaasClient, DEFAULT_TIMEOUT};
pub use common::HttpClient;
pub use common::oauth::ApiKey;
pub use error::MaasError;
pub use models::*;
pub use maas_trait::MaasClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockMaasClient;
