//! Management API seam
//!
//! The engine never touches HTTP, authentication or wire encodings. It talks
//! to a [`ManagementApi`] that issues authenticated GET/PUT calls against the
//! resource paths below and hands back decoded documents.
//!
//! | Call | Path |
//! |---|---|
//! | list webspaces | `GET /partitions` |
//! | list geo regions | `GET /partitions?properties=georegions` |
//! | list sites | `GET /partitions/{p}/resources?filter=name&fields=...` |
//! | read config | `GET /partitions/{p}/resources/{name}/config` |
//! | write config | `PUT /partitions/{p}/resources/{name}/config` |

use async_trait::async_trait;
use sitecfg_model::{GeoRegion, Partition, Site, SiteConfig, SiteProperty};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Request/response client for the remote management store
///
/// Implementations map transport status to [`ApiError`] and never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// All webspaces visible to the subscription, in service order
    async fn list_webspaces(&self) -> Result<Vec<Partition>, ApiError>;

    /// Geo regions visible to the subscription
    async fn list_geo_regions(&self) -> Result<Vec<GeoRegion>, ApiError>;

    /// Sites in one webspace matching the query (zero or one for a name query)
    async fn list_sites(&self, webspace: &str, query: &SiteQuery) -> Result<Vec<Site>, ApiError>;

    /// Full configuration document of a site
    async fn get_site_config(&self, webspace: &str, site: &str) -> Result<SiteConfig, ApiError>;

    /// Overwrite the full configuration document of a site
    async fn put_site_config(
        &self,
        webspace: &str,
        site: &str,
        config: &SiteConfig,
    ) -> Result<(), ApiError>;
}

/// Site listing filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteQuery {
    /// Only sites with this name
    pub name: Option<String>,
    /// Extra properties to include in each summary
    pub properties: Vec<SiteProperty>,
}

impl SiteQuery {
    /// Query for a single site name
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            properties: Vec::new(),
        }
    }

    /// Ask for extra properties
    #[inline]
    #[must_use]
    pub fn with_properties(mut self, properties: impl IntoIterator<Item = SiteProperty>) -> Self {
        self.properties = properties.into_iter().collect();
        self
    }

    /// Whether a returned summary satisfies the name filter
    #[inline]
    #[must_use]
    pub fn matches(&self, site: &Site) -> bool {
        self.name.as_deref().map_or(true, |name| site.has_name(name))
    }
}

/// Resource addressed by a management call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    Webspaces,
    GeoRegions,
    Sites { webspace: String, query: SiteQuery },
    SiteConfig { webspace: String, site: String },
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webspaces => f.write_str("/partitions"),
            Self::GeoRegions => f.write_str("/partitions?properties=georegions"),
            Self::Sites { webspace, query } => {
                write!(f, "/partitions/{webspace}/resources")?;
                let mut sep = '?';
                if let Some(name) = &query.name {
                    write!(f, "{sep}filter=name eq '{name}'")?;
                    sep = '&';
                }
                if !query.properties.is_empty() {
                    let fields: Vec<_> = query.properties.iter().map(|p| p.query_value()).collect();
                    write!(f, "{sep}fields={}", fields.join(","))?;
                }
                Ok(())
            }
            Self::SiteConfig { webspace, site } => {
                write!(f, "/partitions/{webspace}/resources/{site}/config")
            }
        }
    }
}

/// HTTP verb of a management call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        })
    }
}

/// Failure reported by the management API collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Network or protocol failure; nothing is known about server state
    #[error("{method} {path} failed: {message}")]
    Transport {
        method: Method,
        path: String,
        message: String,
    },

    /// Addressed resource does not exist
    #[error("{path} not found")]
    NotFound { path: String },

    /// Backend rejected a write because the resource changed underneath it
    #[error("{path} rejected the write: {message}")]
    Conflict { path: String, message: String },
}

impl ApiError {
    /// Transport failure for a call
    #[inline]
    pub fn transport(method: Method, path: &ResourcePath, message: impl Into<String>) -> Self {
        Self::Transport {
            method,
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Missing resource
    #[inline]
    pub fn not_found(path: &ResourcePath) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    /// Rejected write
    #[inline]
    pub fn conflict(path: &ResourcePath, message: impl Into<String>) -> Self {
        Self::Conflict {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Decorator that bounds every call with a deadline
///
/// An expired call surfaces as [`ApiError::Transport`]. For a write this means
/// the outcome is unknown, exactly like a dropped connection.
pub struct TimeoutApi {
    inner: Arc<dyn ManagementApi>,
    timeout: Duration,
}

impl TimeoutApi {
    /// Wrap `inner` with a per-call deadline
    #[inline]
    #[must_use]
    pub fn new(inner: Arc<dyn ManagementApi>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        method: Method,
        path: impl FnOnce() -> ResourcePath,
        call: impl std::future::Future<Output = Result<T, ApiError>> + Send,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::transport(
                method,
                &path(),
                format!("timed out after {}ms", self.timeout.as_millis()),
            )),
        }
    }
}

#[async_trait]
impl ManagementApi for TimeoutApi {
    async fn list_webspaces(&self) -> Result<Vec<Partition>, ApiError> {
        self.bounded(Method::Get, || ResourcePath::Webspaces, self.inner.list_webspaces())
            .await
    }

    async fn list_geo_regions(&self) -> Result<Vec<GeoRegion>, ApiError> {
        self.bounded(Method::Get, || ResourcePath::GeoRegions, self.inner.list_geo_regions())
            .await
    }

    async fn list_sites(&self, webspace: &str, query: &SiteQuery) -> Result<Vec<Site>, ApiError> {
        self.bounded(
            Method::Get,
            || ResourcePath::Sites {
                webspace: webspace.to_string(),
                query: query.clone(),
            },
            self.inner.list_sites(webspace, query),
        )
        .await
    }

    async fn get_site_config(&self, webspace: &str, site: &str) -> Result<SiteConfig, ApiError> {
        self.bounded(
            Method::Get,
            || ResourcePath::SiteConfig {
                webspace: webspace.to_string(),
                site: site.to_string(),
            },
            self.inner.get_site_config(webspace, site),
        )
        .await
    }

    async fn put_site_config(
        &self,
        webspace: &str,
        site: &str,
        config: &SiteConfig,
    ) -> Result<(), ApiError> {
        self.bounded(
            Method::Put,
            || ResourcePath::SiteConfig {
                webspace: webspace.to_string(),
                site: site.to_string(),
            },
            self.inner.put_site_config(webspace, site, config),
        )
        .await
    }
}
