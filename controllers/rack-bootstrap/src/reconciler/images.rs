//! Boot image reconcilers
//!
//! Handles: boot source selections and the image import

use super::Reconciler;
use crate::error::BootstrapError;
use crate::readiness::{PollPolicy, wait_until};
use crate::reconcile_helpers::reconcile;
use maas_client::BootSourceSelectionSpec;
use tracing::{info, warn};

impl Reconciler {
    /// Select the desired images on the first boot source
    pub async fn reconcile_boot_selections(&self) -> Result<usize, BootstrapError> {
        let sources = self.client.list_boot_sources().await?;
        let source = sources.first().ok_or_else(|| {
            BootstrapError::Prerequisite("MAAS has no boot source configured".to_string())
        })?;

        let desired: Vec<BootSourceSelectionSpec> = self
            .baseline
            .boot_images
            .iter()
            .map(|image| BootSourceSelectionSpec {
                boot_source_id: source.id,
                os: image.os.clone(),
                release: image.release.clone(),
                arches: image.arches.clone(),
                subarches: image.subarches.clone(),
                labels: image.labels.clone(),
            })
            .collect();

        let existing = self.client.list_boot_source_selections(source.id).await?;
        let client = &*self.client;
        let created = reconcile("boot source selection", &existing, &desired, move |spec| async move {
            client.create_boot_source_selection(&spec).await
        })
        .await?;
        Ok(created.len())
    }

    /// Start an image import and wait for it to finish
    ///
    /// An error while polling the import status is logged and counts as
    /// "still importing". Returns the number of status polls.
    pub async fn import_images(&self, policy: PollPolicy) -> Result<u32, BootstrapError> {
        info!("Starting boot image import");
        self.client.start_import().await?;

        let client = &*self.client;
        let polls = wait_until("boot image import", policy, move || async move {
            match client.is_importing().await {
                Ok(importing) => !importing,
                Err(e) => {
                    warn!("Could not query import status: {}", e);
                    false
                }
            }
        })
        .await?;

        info!("Boot images imported");
        Ok(polls)
    }
}
