//! Webspaces (regional partitions) and geo regions

use serde::{Deserialize, Serialize};
use std::fmt;

/// A regional pool of hosting capacity; the unit of sharding for sites
///
/// Created fresh by every directory query. Two partitions are the same
/// partition exactly when their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Partition {
    /// Webspace name, e.g. `eastuswebspace`
    pub name: String,
    /// Data-center label, e.g. `BLU`
    #[serde(default)]
    pub geo_location: Option<String>,
    /// Region label, e.g. `East US`
    #[serde(default)]
    pub geo_region: Option<String>,
    /// Readiness status
    #[serde(default)]
    pub status: PartitionStatus,
    /// Hosting plan, e.g. `VirtualDedicatedPlan`
    #[serde(default)]
    pub plan: Option<String>,
}

impl Partition {
    /// Create a ready partition with only a name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geo_location: None,
            geo_region: None,
            status: PartitionStatus::Ready,
            plan: None,
        }
    }

    /// Set the geographic labels
    #[inline]
    #[must_use]
    pub fn with_geo(mut self, location: impl Into<String>, region: impl Into<String>) -> Self {
        self.geo_location = Some(location.into());
        self.geo_region = Some(region.into());
        self
    }

    /// Whether the partition reports itself ready
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == PartitionStatus::Ready
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.geo_region {
            Some(region) => write!(f, "{} ({region})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Partition readiness as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PartitionStatus {
    /// Accepting sites
    #[default]
    Ready,
    /// Still provisioning
    Pending,
    /// Any status this model does not name
    Other(String),
}

impl From<String> for PartitionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Ready" => Self::Ready,
            "Pending" => Self::Pending,
            _ => Self::Other(s),
        }
    }
}

impl From<PartitionStatus> for String {
    fn from(status: PartitionStatus) -> Self {
        match status {
            PartitionStatus::Ready => "Ready".to_string(),
            PartitionStatus::Pending => "Pending".to_string(),
            PartitionStatus::Other(s) => s,
        }
    }
}

/// A geographic region label visible to the subscription
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeoRegion {
    /// Display name, e.g. `East US`
    pub name: String,
}

impl GeoRegion {
    /// Create a region label
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
