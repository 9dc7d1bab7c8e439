//! In-memory management store
//!
//! A [`ManagementApi`] backed by a snapshot of webspaces, sites and their
//! configuration documents. The CLI persists snapshots to disk between runs;
//! tests use it as a fake backend.
//!
//! With versioning enabled the store behaves like a backend that issues
//! concurrency tokens: every read carries the current token, and a write
//! whose token is missing or stale is rejected with [`ApiError::Conflict`].
//!
//! Like the service, the store reports an empty handler mapping collection
//! as nil once it has been written.

use crate::client::{ApiError, ManagementApi, Method, ResourcePath, SiteQuery};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sitecfg_model::{GeoRegion, Partition, Site, SiteConfig};

/// A site and its configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteRecord {
    pub site: Site,
    #[serde(default)]
    pub config: SiteConfig,
}

/// Serializable contents of a store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub webspaces: Vec<Partition>,
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
}

impl StoreSnapshot {
    /// Empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a webspace appended
    #[inline]
    #[must_use]
    pub fn with_webspace(mut self, partition: Partition) -> Self {
        self.webspaces.push(partition);
        self
    }

    /// With a site and its document appended
    #[inline]
    #[must_use]
    pub fn with_site(mut self, site: Site, config: SiteConfig) -> Self {
        self.sites.push(SiteRecord { site, config });
        self
    }

    fn record(&self, webspace: &str, site: &str) -> Option<&SiteRecord> {
        self.sites
            .iter()
            .find(|r| r.site.webspace == webspace && r.site.has_name(site))
    }

    fn record_mut(&mut self, webspace: &str, site: &str) -> Option<&mut SiteRecord> {
        self.sites
            .iter_mut()
            .find(|r| r.site.webspace == webspace && r.site.has_name(site))
    }

    fn has_webspace(&self, webspace: &str) -> bool {
        self.webspaces.iter().any(|p| p.name == webspace)
    }
}

struct StoreState {
    snapshot: StoreSnapshot,
    next_version: u64,
}

/// Management API over an in-process snapshot
pub struct InMemoryManagementApi {
    state: RwLock<StoreState>,
    versioned: bool,
}

impl InMemoryManagementApi {
    /// Store without concurrency tokens
    #[must_use]
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(StoreState {
                snapshot,
                next_version: 1,
            }),
            versioned: false,
        }
    }

    /// Store that issues and checks concurrency tokens
    ///
    /// Documents without a token are stamped on construction.
    #[must_use]
    pub fn versioned(snapshot: StoreSnapshot) -> Self {
        let store = Self {
            versioned: true,
            ..Self::new(snapshot)
        };
        {
            let mut state = store.state.write();
            let mut next = state.next_version;
            for record in &mut state.snapshot.sites {
                if record.config.version.is_none() {
                    record.config.version = Some(next.to_string());
                    next += 1;
                }
            }
            state.next_version = next;
        }
        store
    }

    /// Copy of the current contents
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().snapshot.clone()
    }

    /// Current document of a site, without going through the API
    #[must_use]
    pub fn site_config(&self, webspace: &str, site: &str) -> Option<SiteConfig> {
        self.state
            .read()
            .snapshot
            .record(webspace, site)
            .map(|r| r.config.clone())
    }

    /// Replace a site's document as an outside writer would
    ///
    /// Bumps the token on a versioned store. Returns `false` if the site
    /// does not exist.
    pub fn set_site_config(&self, webspace: &str, site: &str, mut config: SiteConfig) -> bool {
        let mut state = self.state.write();
        if self.versioned {
            config.version = Some(state.next_version.to_string());
            state.next_version += 1;
        }
        match state.snapshot.record_mut(webspace, site) {
            Some(record) => {
                record.config = config;
                true
            }
            None => false,
        }
    }

    fn config_path(webspace: &str, site: &str) -> ResourcePath {
        ResourcePath::SiteConfig {
            webspace: webspace.to_string(),
            site: site.to_string(),
        }
    }
}

#[async_trait]
impl ManagementApi for InMemoryManagementApi {
    async fn list_webspaces(&self) -> Result<Vec<Partition>, ApiError> {
        Ok(self.state.read().snapshot.webspaces.clone())
    }

    async fn list_geo_regions(&self) -> Result<Vec<GeoRegion>, ApiError> {
        Ok(self
            .state
            .read()
            .snapshot
            .webspaces
            .iter()
            .filter_map(|p| p.geo_region.as_deref().map(GeoRegion::new))
            .collect())
    }

    async fn list_sites(&self, webspace: &str, query: &SiteQuery) -> Result<Vec<Site>, ApiError> {
        let state = self.state.read();
        if !state.snapshot.has_webspace(webspace) {
            return Err(ApiError::not_found(&ResourcePath::Sites {
                webspace: webspace.to_string(),
                query: query.clone(),
            }));
        }
        Ok(state
            .snapshot
            .sites
            .iter()
            .filter(|r| r.site.webspace == webspace && query.matches(&r.site))
            .map(|r| r.site.clone())
            .collect())
    }

    async fn get_site_config(&self, webspace: &str, site: &str) -> Result<SiteConfig, ApiError> {
        self.site_config(webspace, site)
            .ok_or_else(|| ApiError::not_found(&Self::config_path(webspace, site)))
    }

    async fn put_site_config(
        &self,
        webspace: &str,
        site: &str,
        config: &SiteConfig,
    ) -> Result<(), ApiError> {
        let path = Self::config_path(webspace, site);
        let mut state = self.state.write();
        let next = state.next_version;
        let record = state
            .snapshot
            .record_mut(webspace, site)
            .ok_or_else(|| ApiError::not_found(&path))?;

        let mut stored = config.clone();
        if stored.handler_mappings.as_ref().is_some_and(Vec::is_empty) {
            stored.handler_mappings = None;
        }
        if self.versioned {
            if stored.version != record.config.version {
                return Err(ApiError::conflict(
                    &path,
                    format!(
                        "version {} does not match current {}",
                        stored.version.as_deref().unwrap_or("<none>"),
                        record.config.version.as_deref().unwrap_or("<none>")
                    ),
                ));
            }
            stored.version = Some(next.to_string());
        }
        record.config = stored;

        if self.versioned {
            state.next_version += 1;
        }
        tracing::trace!(method = %Method::Put, %path, "store updated");
        Ok(())
    }
}
