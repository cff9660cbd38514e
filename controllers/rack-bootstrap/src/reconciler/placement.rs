//! Placement reconcilers
//!
//! Handles: availability zones and machine tags

use super::Reconciler;
use crate::error::BootstrapError;
use crate::reconcile_helpers::reconcile;

impl Reconciler {
    pub async fn reconcile_zones(&self) -> Result<usize, BootstrapError> {
        let existing = self.client.list_zones().await?;
        let client = &*self.client;
        let created = reconcile("zone", &existing, &self.baseline.zones, move |spec| async move {
            client.create_zone(&spec).await
        })
        .await?;
        Ok(created.len())
    }

    pub async fn reconcile_tags(&self) -> Result<usize, BootstrapError> {
        let existing = self.client.list_tags().await?;
        let client = &*self.client;
        let created = reconcile("tag", &existing, &self.baseline.tags, move |spec| async move {
            client.create_tag(&spec).await
        })
        .await?;
        Ok(created.len())
    }
}
