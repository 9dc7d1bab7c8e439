//! Resource locator
//!
//! Site names are unique per subscription, but the owning webspace is not
//! known up front and has to be found by elimination. The locator asks each
//! webspace for the name, in directory order, and stops at the first hit.
//!
//! Scanning runs over an ordered, bounded stream of webspace queries: with
//! [`SearchStrategy::Sequential`] one webspace is queried at a time; with
//! [`SearchStrategy::FanOut`] several are in flight, but results are still
//! consumed in directory order. Returning early drops the stream, which
//! cancels in-flight queries and never starts the remaining ones.
//!
//! If a backend ever reported the same name in two webspaces, the first in
//! directory order wins and the rest are never consulted. This is a
//! simplification, not deduplication.

use crate::client::{ManagementApi, SiteQuery};
use crate::directory::PartitionDirectory;
use crate::error::{SiteError, Stage};
use crate::types::{LocatedSite, SearchStrategy};
use futures::stream::{self, StreamExt};
use sitecfg_model::{Partition, SiteProperty};
use std::sync::Arc;

/// Finds the webspace that holds a named site
#[derive(Clone)]
pub struct ResourceLocator {
    directory: PartitionDirectory,
    api: Arc<dyn ManagementApi>,
    strategy: SearchStrategy,
    properties: Vec<SiteProperty>,
}

impl ResourceLocator {
    /// Sequential locator requesting no extra properties
    #[inline]
    #[must_use]
    pub fn new(api: Arc<dyn ManagementApi>) -> Self {
        Self {
            directory: PartitionDirectory::new(Arc::clone(&api)),
            api,
            strategy: SearchStrategy::Sequential,
            properties: Vec::new(),
        }
    }

    /// With scan strategy
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// With extra properties requested from each listing
    #[inline]
    #[must_use]
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = SiteProperty>) -> Self {
        self.properties = properties.into_iter().collect();
        self
    }

    /// The directory this locator lists webspaces from
    #[inline]
    #[must_use]
    pub fn directory(&self) -> &PartitionDirectory {
        &self.directory
    }

    /// Locate a site across all webspaces
    ///
    /// # Errors
    /// - `SiteError::SiteNotFound` once every webspace has been asked
    /// - Any failure of the directory or of a webspace query, immediately
    pub async fn locate(&self, name: &str) -> Result<LocatedSite, SiteError> {
        let partitions = self.directory.list_partitions().await?;
        self.locate_in(name, partitions).await
    }

    /// Locate a site across the given webspaces, in order
    ///
    /// # Errors
    /// Same as [`locate`](Self::locate), minus the directory failure.
    pub async fn locate_in(
        &self,
        name: &str,
        partitions: Vec<Partition>,
    ) -> Result<LocatedSite, SiteError> {
        let searched = partitions.len();
        let query = SiteQuery::named(name).with_properties(self.properties.iter().copied());
        let query = &query;

        let mut lookups = stream::iter(partitions)
            .map(|partition| async move {
                let found = self.search_webspace(&partition, query).await?;
                Ok::<_, SiteError>(found.map(|site| LocatedSite { partition, site }))
            })
            .buffered(self.strategy.max_in_flight());

        while let Some(result) = lookups.next().await {
            if let Some(located) = result? {
                tracing::info!(
                    site = %located.site.name,
                    webspace = %located.partition.name,
                    "located site"
                );
                return Ok(located);
            }
        }

        Err(SiteError::SiteNotFound {
            name: name.to_string(),
            partitions_searched: searched,
        })
    }

    async fn search_webspace(
        &self,
        partition: &Partition,
        query: &SiteQuery,
    ) -> Result<Option<sitecfg_model::Site>, SiteError> {
        let name = query.name.as_deref().unwrap_or_default();
        let sites = self
            .api
            .list_sites(&partition.name, query)
            .await
            .map_err(|e| SiteError::from_api(Stage::LocateSite, name, e))?;
        tracing::debug!(webspace = %partition.name, returned = sites.len(), "searched webspace");

        // Backends that ignore the name filter return the whole webspace.
        Ok(sites.into_iter().find(|site| query.matches(site)))
    }
}
