//! Testing utilities for sitecfg workspace
//!
//! Fixtures taken from a recorded management session, plus wrappers that
//! record or sabotage calls made against a [`ManagementApi`].

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sitecfg_core::{
    ApiError, InMemoryManagementApi, ManagementApi, Method, OrchestratorConfig, ResourcePath,
    SiteQuery, StoreSnapshot, UpdateOrchestrator,
};
use sitecfg_model::{GeoRegion, Partition, Site, SiteConfig, SiteProperty};
use std::sync::Arc;

/// Webspace that holds the recorded sites
pub const RECORDED_WEBSPACE: &str = "eastuswebspace";

/// Site the recorded session edits
pub const RECORDED_SITE: &str = "clitsts1";

/// Script processor the recorded session maps `.js` to
pub const RECORDED_PROCESSOR: &str = "c:\\node\\node.exe";

/// The six webspaces of the recorded session, in service order
pub fn recorded_webspaces() -> Vec<Partition> {
    [
        ("eastasiawebspace", "HKG", "East Asia"),
        ("eastuswebspace", "BLU", "East US"),
        ("northcentraluswebspace", "CH1", "North Central US"),
        ("northeuropewebspace", "DB3", "North Europe"),
        ("westeuropewebspace", "AM2", "West Europe"),
        ("westuswebspace", "BAY", "West US"),
    ]
    .into_iter()
    .map(|(name, location, region)| {
        let mut partition = Partition::new(name).with_geo(location, region);
        partition.plan = Some("VirtualDedicatedPlan".to_string());
        partition
    })
    .collect()
}

/// Recorded site summary, with publishing properties filled in
pub fn recorded_site(name: &str) -> Site {
    Site::new(name, RECORDED_WEBSPACE)
        .with_host_name(format!("{name}.azurewebsites.net"))
        .with_property(
            SiteProperty::RepositoryUri,
            format!("https://{name}.scm.azurewebsites.net:443/{name}.git"),
        )
        .with_property(SiteProperty::PublishingUsername, format!("${name}"))
        .with_property(SiteProperty::PublishingPassword, "secret")
}

/// Recorded configuration of a freshly created site: no handler mappings
pub fn recorded_config() -> SiteConfig {
    SiteConfig {
        default_documents: Some(vec![
            "Default.htm".into(),
            "Default.html".into(),
            "index.htm".into(),
            "index.html".into(),
        ]),
        detailed_error_logging_enabled: Some(false),
        http_logging_enabled: Some(false),
        net_framework_version: Some("v4.0".into()),
        number_of_workers: Some(1),
        php_version: Some("5.3".into()),
        request_tracing_enabled: Some(false),
        use_32_bit_worker_process: Some(true),
        web_sockets_enabled: Some(false),
        handler_mappings: None,
        ..SiteConfig::default()
    }
}

/// Store contents matching the recorded session
pub fn recorded_snapshot() -> StoreSnapshot {
    let mut snapshot = StoreSnapshot::new();
    snapshot.webspaces = recorded_webspaces();
    snapshot
        .with_site(recorded_site("clitests1"), recorded_config())
        .with_site(recorded_site(RECORDED_SITE), recorded_config())
}

/// In-memory store loaded with the recorded session
pub fn recorded_store() -> Arc<InMemoryManagementApi> {
    Arc::new(InMemoryManagementApi::new(recorded_snapshot()))
}

/// Orchestrator with default configuration over any API
pub fn setup_orchestrator(api: Arc<dyn ManagementApi>) -> UpdateOrchestrator {
    UpdateOrchestrator::new(api, OrchestratorConfig::new())
}

/// One call observed by [`RecordingApi`]
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    ListWebspaces,
    ListGeoRegions,
    ListSites { webspace: String, query: SiteQuery },
    GetSiteConfig { webspace: String, site: String },
    PutSiteConfig { webspace: String, site: String, config: SiteConfig },
}

impl ApiCall {
    /// Whether the call mutates remote state
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::PutSiteConfig { .. })
    }
}

/// Wrapper that logs every call before delegating
pub struct RecordingApi {
    inner: Arc<dyn ManagementApi>,
    calls: Mutex<Vec<ApiCall>>,
}

impl RecordingApi {
    #[must_use]
    pub fn new(inner: Arc<dyn ManagementApi>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls seen so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    /// Webspaces queried for sites, in order
    #[must_use]
    pub fn site_queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ApiCall::ListSites { webspace, .. } => Some(webspace.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of writes seen
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_write()).count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ManagementApi for RecordingApi {
    async fn list_webspaces(&self) -> Result<Vec<Partition>, ApiError> {
        self.record(ApiCall::ListWebspaces);
        self.inner.list_webspaces().await
    }

    async fn list_geo_regions(&self) -> Result<Vec<GeoRegion>, ApiError> {
        self.record(ApiCall::ListGeoRegions);
        self.inner.list_geo_regions().await
    }

    async fn list_sites(&self, webspace: &str, query: &SiteQuery) -> Result<Vec<Site>, ApiError> {
        self.record(ApiCall::ListSites {
            webspace: webspace.to_string(),
            query: query.clone(),
        });
        self.inner.list_sites(webspace, query).await
    }

    async fn get_site_config(&self, webspace: &str, site: &str) -> Result<SiteConfig, ApiError> {
        self.record(ApiCall::GetSiteConfig {
            webspace: webspace.to_string(),
            site: site.to_string(),
        });
        self.inner.get_site_config(webspace, site).await
    }

    async fn put_site_config(
        &self,
        webspace: &str,
        site: &str,
        config: &SiteConfig,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::PutSiteConfig {
            webspace: webspace.to_string(),
            site: site.to_string(),
            config: config.clone(),
        });
        self.inner.put_site_config(webspace, site, config).await
    }
}

/// Which call a [`FaultyApi`] sabotages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Listing webspaces fails
    ListWebspaces,
    /// Listing sites in this webspace fails
    ListSites(String),
    /// Reading configuration fails
    GetSiteConfig,
    /// Writing fails before reaching the store
    PutRejected,
    /// Writing reaches the store, then the response is lost
    PutLostResponse,
}

/// Wrapper that fails one kind of call with a transport error
pub struct FaultyApi {
    inner: Arc<dyn ManagementApi>,
    fault: Fault,
}

impl FaultyApi {
    #[must_use]
    pub fn new(inner: Arc<dyn ManagementApi>, fault: Fault) -> Self {
        Self { inner, fault }
    }

    fn fail(method: Method, path: &ResourcePath) -> ApiError {
        ApiError::transport(method, path, "injected fault")
    }
}

#[async_trait]
impl ManagementApi for FaultyApi {
    async fn list_webspaces(&self) -> Result<Vec<Partition>, ApiError> {
        if self.fault == Fault::ListWebspaces {
            return Err(Self::fail(Method::Get, &ResourcePath::Webspaces));
        }
        self.inner.list_webspaces().await
    }

    async fn list_geo_regions(&self) -> Result<Vec<GeoRegion>, ApiError> {
        self.inner.list_geo_regions().await
    }

    async fn list_sites(&self, webspace: &str, query: &SiteQuery) -> Result<Vec<Site>, ApiError> {
        if matches!(&self.fault, Fault::ListSites(w) if w == webspace) {
            return Err(Self::fail(
                Method::Get,
                &ResourcePath::Sites {
                    webspace: webspace.to_string(),
                    query: query.clone(),
                },
            ));
        }
        self.inner.list_sites(webspace, query).await
    }

    async fn get_site_config(&self, webspace: &str, site: &str) -> Result<SiteConfig, ApiError> {
        if self.fault == Fault::GetSiteConfig {
            return Err(Self::fail(
                Method::Get,
                &ResourcePath::SiteConfig {
                    webspace: webspace.to_string(),
                    site: site.to_string(),
                },
            ));
        }
        self.inner.get_site_config(webspace, site).await
    }

    async fn put_site_config(
        &self,
        webspace: &str,
        site: &str,
        config: &SiteConfig,
    ) -> Result<(), ApiError> {
        let path = ResourcePath::SiteConfig {
            webspace: webspace.to_string(),
            site: site.to_string(),
        };
        match self.fault {
            Fault::PutRejected => Err(Self::fail(Method::Put, &path)),
            Fault::PutLostResponse => {
                self.inner.put_site_config(webspace, site, config).await?;
                Err(Self::fail(Method::Put, &path))
            }
            _ => self.inner.put_site_config(webspace, site, config).await,
        }
    }
}
