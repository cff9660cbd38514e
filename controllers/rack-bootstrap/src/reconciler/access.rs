//! Access reconcilers
//!
//! Handles: SSH keys imported from a key source and the local public key

use super::Reconciler;
use crate::error::BootstrapError;
use crate::reconcile_helpers::reconcile;
use maas_client::SshKeySpec;
use std::io::ErrorKind;
use tracing::{debug, info, warn};

impl Reconciler {
    /// Authorize the configured SSH keys
    ///
    /// A key source (`lp:<user>`, `gh:<user>`) is imported once; MAAS records
    /// the source on each key it imports. The local public key is created if
    /// MAAS does not already hold the same key material.
    pub async fn reconcile_ssh_keys(&self) -> Result<usize, BootstrapError> {
        let mut existing = self.client.list_ssh_keys().await?;
        let mut created = 0;

        if let Some(source) = &self.ssh_import_id {
            if existing.iter().any(|k| k.keysource.as_deref() == Some(source.as_str())) {
                debug!("SSH keys from {} already imported", source);
            } else {
                info!("Importing SSH keys from {}", source);
                let imported = self.client.import_ssh_keys(source).await.map_err(|e| {
                    BootstrapError::Reconciliation {
                        kind: "SSH key import",
                        key: source.clone(),
                        source: e,
                    }
                })?;
                info!("Imported {} SSH key(s) from {}", imported.len(), source);
                created += imported.len();
                existing = self.client.list_ssh_keys().await?;
            }
        }

        if let Some(key) = self.read_public_key().await? {
            let desired = [SshKeySpec { key }];
            let client = &*self.client;
            created += reconcile("SSH key", &existing, &desired, move |spec| async move {
                client.create_ssh_key(&spec).await
            })
            .await?
            .len();
        }

        Ok(created)
    }

    async fn read_public_key(&self) -> Result<Option<String>, BootstrapError> {
        let path = &self.ssh_public_key;
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let key = contents.trim();
                if key.is_empty() {
                    warn!("Public key file {} is empty, skipping", path.display());
                    return Ok(None);
                }
                Ok(Some(key.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("No public key at {}, skipping", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
