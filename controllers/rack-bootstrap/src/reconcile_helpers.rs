//! Helper functions for common reconciliation patterns
//!
//! Every baseline object kind is reconciled the same way: list what MAAS has,
//! diff it against the desired set by identity key, create what is missing.
//! Nothing is ever updated or deleted.

use crate::error::BootstrapError;
use maas_client::MaasError;
use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use tracing::{debug, info};

/// An object with an identity key used to decide whether it already exists
pub trait Keyed {
    type Key: Eq + Hash + Debug;

    fn key(&self) -> Self::Key;

    /// Human readable form used in logs and errors
    fn describe(&self) -> String {
        format!("{:?}", self.key())
    }
}

impl Keyed for maas_client::Zone {
    type Key = String;
    fn key(&self) -> String { self.name.clone() }
    fn describe(&self) -> String { self.name.clone() }
}
impl Keyed for maas_client::ZoneSpec {
    type Key = String;
    fn key(&self) -> String { self.name.clone() }
    fn describe(&self) -> String { self.name.clone() }
}
impl Keyed for maas_client::Tag {
    type Key = String;
    fn key(&self) -> String { self.name.clone() }
    fn describe(&self) -> String { self.name.clone() }
}
impl Keyed for maas_client::TagSpec {
    type Key = String;
    fn key(&self) -> String { self.name.clone() }
    fn describe(&self) -> String { self.name.clone() }
}
impl Keyed for maas_client::BootSourceSelection {
    type Key = (String, String);
    fn key(&self) -> Self::Key { (self.os.clone(), self.release.clone()) }
    fn describe(&self) -> String { format!("{}/{}", self.os, self.release) }
}
impl Keyed for maas_client::BootSourceSelectionSpec {
    type Key = (String, String);
    fn key(&self) -> Self::Key { (self.os.clone(), self.release.clone()) }
    fn describe(&self) -> String { format!("{}/{}", self.os, self.release) }
}
impl Keyed for maas_client::SshKey {
    type Key = String;
    fn key(&self) -> String { self.key.trim().to_string() }
    fn describe(&self) -> String { key_fingerprint(&self.key) }
}
impl Keyed for maas_client::SshKeySpec {
    type Key = String;
    fn key(&self) -> String { self.key.trim().to_string() }
    fn describe(&self) -> String { key_fingerprint(&self.key) }
}

// IP ranges are list-identified: any existing range satisfies the desired one
impl Keyed for maas_client::IpRange {
    type Key = ();
    fn key(&self) {}
    fn describe(&self) -> String { format!("{}-{}", self.start_ip, self.end_ip) }
}
impl Keyed for maas_client::IpRangeSpec {
    type Key = ();
    fn key(&self) {}
    fn describe(&self) -> String { format!("{}-{}", self.start_ip, self.end_ip) }
}

/// Key type plus the last few characters of the key material
fn key_fingerprint(key: &str) -> String {
    let mut parts = key.split_whitespace();
    let kind = parts.next().unwrap_or("key");
    let material = parts.next().unwrap_or("");
    let tail: String = material.chars().rev().take(8).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{} ...{}", kind, tail)
}

/// Create every desired item whose key is not present in `existing`
///
/// Desired items are processed in order. Keys created during this call count
/// as present, so a key listed twice in `desired` is created once. The first
/// create failure aborts with `BootstrapError::Reconciliation` naming the
/// kind and key; items created before it stay created.
///
/// Returns the objects created by this call.
pub async fn reconcile<E, D, F, Fut>(
    kind: &'static str,
    existing: &[E],
    desired: &[D],
    mut create: F,
) -> Result<Vec<E>, BootstrapError>
where
    E: Keyed,
    D: Keyed<Key = E::Key> + Clone,
    F: FnMut(D) -> Fut,
    Fut: Future<Output = Result<E, MaasError>>,
{
    let mut present: HashSet<E::Key> = existing.iter().map(Keyed::key).collect();
    let mut created = Vec::new();

    for item in desired {
        let key = item.key();
        if present.contains(&key) {
            debug!("{} {} already exists, skipping", kind, item.describe());
            continue;
        }

        info!("Creating {} {}", kind, item.describe());
        let object = create(item.clone())
            .await
            .map_err(|source| BootstrapError::Reconciliation {
                kind,
                key: item.describe(),
                source,
            })?;
        info!("Created {} {}", kind, object.describe());

        present.insert(key);
        created.push(object);
    }

    if created.is_empty() {
        debug!("All {} {} entries present", desired.len(), kind);
    }
    Ok(created)
}

#[cfg(test)]
#[path = "reconcile_helpers_test.rs"]
mod reconcile_helpers_test;
