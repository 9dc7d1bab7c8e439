//! Partition directory
//!
//! Lists the webspaces visible to the ambient subscription. There is no local
//! fallback: a failed listing is fatal to whatever depends on it.

use crate::client::ManagementApi;
use crate::error::{SiteError, Stage};
use sitecfg_model::{GeoRegion, Partition};
use std::sync::Arc;

/// Resolves the webspaces available to the subscription
#[derive(Clone)]
pub struct PartitionDirectory {
    api: Arc<dyn ManagementApi>,
}

impl PartitionDirectory {
    /// Create a directory over a management client
    #[inline]
    #[must_use]
    pub fn new(api: Arc<dyn ManagementApi>) -> Self {
        Self { api }
    }

    /// All webspaces, in the order the service returned them
    ///
    /// # Errors
    /// Returns the classified API failure; nothing is cached.
    pub async fn list_partitions(&self) -> Result<Vec<Partition>, SiteError> {
        let partitions = self
            .api
            .list_webspaces()
            .await
            .map_err(|e| SiteError::from_api(Stage::ListPartitions, "", e))?;
        tracing::debug!(count = partitions.len(), "listed webspaces");
        Ok(partitions)
    }

    /// Distinct geo regions, first occurrence order
    ///
    /// # Errors
    /// Returns the classified API failure.
    pub async fn list_geo_regions(&self) -> Result<Vec<GeoRegion>, SiteError> {
        let regions = self
            .api
            .list_geo_regions()
            .await
            .map_err(|e| SiteError::from_api(Stage::ListGeoRegions, "", e))?;

        let mut distinct: Vec<GeoRegion> = Vec::with_capacity(regions.len());
        for region in regions {
            if !distinct.contains(&region) {
                distinct.push(region);
            }
        }
        Ok(distinct)
    }
}
