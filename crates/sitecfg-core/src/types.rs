//! Core types for sitecfg
//!
//! Defines the orchestrator configuration, per-call options and the values
//! an update hands back to its caller.

use serde::{Deserialize, Serialize};
use sitecfg_model::{MappingChange, Partition, Site, SiteConfig, SiteProperty};
use std::time::Duration;
use ulid::Ulid;

/// Unique identifier of one orchestrator invocation (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Ulid);

impl OperationId {
    /// Generate new operation ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the locator walks the webspaces
///
/// Both strategies consult webspaces in directory order and report the
/// first match in that order; a hit stops every outstanding query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SearchStrategy {
    /// One webspace at a time
    #[default]
    Sequential,
    /// Up to `max_in_flight` webspace queries at once
    FanOut { max_in_flight: usize },
}

impl SearchStrategy {
    /// Number of concurrent webspace queries
    #[inline]
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::FanOut { max_in_flight } => (*max_in_flight).max(1),
        }
    }
}

/// Write policy regarding concurrency tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyMode {
    /// Send the document whether or not it carries a version token
    ///
    /// A concurrent external write between fetch and persist is silently
    /// overwritten.
    #[default]
    LastWriterWins,
    /// Refuse to write a document without a version token
    RequireVersion,
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Webspace scan strategy
    pub search: SearchStrategy,
    /// Re-read the document after every write
    pub verify_after_write: bool,
    /// Skip the write when the merge changes nothing
    pub skip_unchanged_writes: bool,
    /// Concurrency token policy
    pub concurrency: ConcurrencyMode,
    /// Extra site properties requested while locating
    pub site_properties: Vec<SiteProperty>,
    /// Per-call deadline in milliseconds
    pub call_timeout_ms: Option<u64>,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With scan strategy
    #[inline]
    #[must_use]
    pub fn with_search(mut self, search: SearchStrategy) -> Self {
        self.search = search;
        self
    }

    /// With verification after write
    #[inline]
    #[must_use]
    pub fn with_verify_after_write(mut self, verify: bool) -> Self {
        self.verify_after_write = verify;
        self
    }

    /// With concurrency policy
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: ConcurrencyMode) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// With per-call deadline
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Per-call deadline
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            search: SearchStrategy::Sequential,
            verify_after_write: false,
            skip_unchanged_writes: false,
            concurrency: ConcurrencyMode::LastWriterWins,
            site_properties: SiteProperty::ALL.to_vec(),
            call_timeout_ms: None,
        }
    }
}

/// Per-invocation options for an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// Re-read after writing and return the re-read document
    pub verify: bool,
    /// Do not write when the merge reports no change
    pub skip_unchanged: bool,
}

impl UpdateOptions {
    /// Options taken from orchestrator configuration
    #[inline]
    #[must_use]
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            verify: config.verify_after_write,
            skip_unchanged: config.skip_unchanged_writes,
        }
    }

    /// With verification
    #[inline]
    #[must_use]
    pub fn verified(mut self) -> Self {
        self.verify = true;
        self
    }
}

/// A site together with the webspace that currently holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSite {
    /// Owning webspace
    pub partition: Partition,
    /// Site summary
    pub site: Site,
}

/// What an update did
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Invocation identifier (also on the tracing span)
    pub operation: OperationId,
    /// Where the site was found
    pub located: LocatedSite,
    /// Effect of the merge on the mapping collection
    pub change: MappingChange,
    /// Whether a write was sent
    pub written: bool,
    /// `Some(matches)` when the document was re-read after the write
    pub verified: Option<bool>,
    /// Merged document, or the re-read one when verified
    pub config: SiteConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_out_never_drops_below_one() {
        assert_eq!(SearchStrategy::Sequential.max_in_flight(), 1);
        assert_eq!(SearchStrategy::FanOut { max_in_flight: 0 }.max_in_flight(), 1);
        assert_eq!(SearchStrategy::FanOut { max_in_flight: 6 }.max_in_flight(), 6);
    }

    #[test]
    fn config_defaults_request_all_properties() {
        let config = OrchestratorConfig::new();
        assert_eq!(config.site_properties.len(), 3);
        assert_eq!(config.call_timeout(), None);
        assert_eq!(config.concurrency, ConcurrencyMode::LastWriterWins);
    }

    #[test]
    fn config_deserializes_partial_document() {
        let config: OrchestratorConfig = serde_json::from_str(
            r#"{"search": {"mode": "fan-out", "max_in_flight": 4}, "concurrency": "require-version"}"#,
        )
        .unwrap();
        assert_eq!(config.search, SearchStrategy::FanOut { max_in_flight: 4 });
        assert_eq!(config.concurrency, ConcurrencyMode::RequireVersion);
        assert!(!config.verify_after_write);
    }

    #[test]
    fn timeout_roundtrips_through_millis() {
        let config = OrchestratorConfig::new().with_call_timeout(Duration::from_secs(30));
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn options_follow_config() {
        let config = OrchestratorConfig::new().with_verify_after_write(true);
        let options = UpdateOptions::from_config(&config);
        assert!(options.verify);
        assert!(!options.skip_unchanged);
        assert!(UpdateOptions::default().verified().verify);
    }
}
