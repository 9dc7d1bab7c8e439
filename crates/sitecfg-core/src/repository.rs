//! Configuration repository
//!
//! Reads and writes a site's configuration document as an opaque whole. The
//! management API has no partial update, so every write sends back the full
//! document, including fields the caller never meant to touch.
//!
//! Unless the backend issues version tokens and [`ConcurrencyMode::RequireVersion`]
//! is in force, a write is not safe against concurrent external writers: a
//! change made between `fetch` and `persist` is silently overwritten.

use crate::client::ManagementApi;
use crate::error::{SiteError, Stage};
use crate::types::ConcurrencyMode;
use sitecfg_model::{ConfigFingerprint, Partition, SiteConfig};
use std::sync::Arc;

/// Result of re-reading a document after a write
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    /// The document as the service now returns it
    pub config: SiteConfig,
    /// Whether it matches what was written
    pub matches: bool,
}

/// Whole-document read and write of site configuration
#[derive(Clone)]
pub struct ConfigRepository {
    api: Arc<dyn ManagementApi>,
    concurrency: ConcurrencyMode,
}

impl ConfigRepository {
    /// Create a last-writer-wins repository
    #[inline]
    #[must_use]
    pub fn new(api: Arc<dyn ManagementApi>) -> Self {
        Self {
            api,
            concurrency: ConcurrencyMode::LastWriterWins,
        }
    }

    /// With concurrency token policy
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: ConcurrencyMode) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Read the full configuration document
    ///
    /// # Errors
    /// Returns `NotFound` or `Transport` classified at [`Stage::FetchConfig`].
    pub async fn fetch(&self, partition: &Partition, site: &str) -> Result<SiteConfig, SiteError> {
        self.read(Stage::FetchConfig, partition, site).await
    }

    /// Overwrite the full configuration document
    ///
    /// # Errors
    /// - `Conflict` if a version token is required and missing, or the
    ///   backend rejected a stale token
    /// - `Transport` if the write failed in flight; the remote state is then
    ///   unknown
    /// - `Document` if the document cannot be encoded; nothing is sent
    pub async fn persist(
        &self,
        partition: &Partition,
        site: &str,
        config: &SiteConfig,
    ) -> Result<(), SiteError> {
        if self.concurrency == ConcurrencyMode::RequireVersion && config.version.is_none() {
            return Err(SiteError::Conflict {
                stage: Stage::PersistConfig,
                site: site.to_string(),
                reason: "document carries no version token".to_string(),
            });
        }
        let digest = fingerprint(Stage::PersistConfig, config)?;

        self.api
            .put_site_config(&partition.name, site, config)
            .await
            .map_err(|e| {
                let err = SiteError::from_api(Stage::PersistConfig, site, e);
                if err.write_may_have_applied() {
                    tracing::warn!(
                        site,
                        webspace = %partition.name,
                        error = %err,
                        "configuration write failed in flight; remote state is indeterminate"
                    );
                }
                err
            })?;

        tracing::info!(site, webspace = %partition.name, fingerprint = %digest.short(), "configuration written");
        Ok(())
    }

    /// Re-read a document and compare it with what was written
    ///
    /// # Errors
    /// Returns the read failure classified at [`Stage::VerifyConfig`], or
    /// `Document` if either side cannot be encoded.
    pub async fn verify(
        &self,
        partition: &Partition,
        site: &str,
        written: &SiteConfig,
    ) -> Result<Verification, SiteError> {
        let config = self.read(Stage::VerifyConfig, partition, site).await?;
        let matches = fingerprint(Stage::VerifyConfig, &comparable(&config))?
            == fingerprint(Stage::VerifyConfig, &comparable(written))?;
        if !matches {
            tracing::warn!(
                site,
                webspace = %partition.name,
                "re-read configuration differs from what was written"
            );
        }
        Ok(Verification { config, matches })
    }

    async fn read(
        &self,
        stage: Stage,
        partition: &Partition,
        site: &str,
    ) -> Result<SiteConfig, SiteError> {
        let config = self
            .api
            .get_site_config(&partition.name, site)
            .await
            .map_err(|e| SiteError::from_api(stage, site, e))?;
        tracing::debug!(site, webspace = %partition.name, %stage, "configuration read");
        Ok(config)
    }
}

/// Content the backend is expected to echo back
///
/// The token may be bumped on write, and an empty handler collection may come
/// back as nil.
fn comparable(config: &SiteConfig) -> SiteConfig {
    let mut config = SiteConfig {
        version: None,
        ..config.clone()
    };
    if config.handler_mappings.as_ref().is_some_and(Vec::is_empty) {
        config.handler_mappings = None;
    }
    config
}

fn fingerprint(stage: Stage, config: &SiteConfig) -> Result<ConfigFingerprint, SiteError> {
    config
        .fingerprint()
        .map_err(|source| SiteError::Document { stage, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiError, Method, MockManagementApi, ResourcePath};
    use crate::error::ErrorKind;
    use sitecfg_model::HandlerMapping;

    fn partition() -> Partition {
        Partition::new("eastuswebspace")
    }

    fn config_path() -> ResourcePath {
        ResourcePath::SiteConfig {
            webspace: "eastuswebspace".into(),
            site: "clitsts1".into(),
        }
    }

    #[tokio::test]
    async fn fetch_missing_site_is_not_found() {
        let mut api = MockManagementApi::new();
        api.expect_get_site_config()
            .returning(|_, _| Err(ApiError::not_found(&config_path())));

        let err = ConfigRepository::new(Arc::new(api))
            .fetch(&partition(), "clitsts1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.stage(), Some(Stage::FetchConfig));
    }

    #[tokio::test]
    async fn persist_sends_whole_document() {
        let config = SiteConfig {
            php_version: Some("5.3".into()),
            handler_mappings: Some(vec![HandlerMapping::new(".js", "node.exe")]),
            ..SiteConfig::default()
        };
        let expected = config.clone();

        let mut api = MockManagementApi::new();
        api.expect_put_site_config()
            .withf(move |ws, site, sent| ws == "eastuswebspace" && site == "clitsts1" && *sent == expected)
            .times(1)
            .returning(|_, _, _| Ok(()));

        ConfigRepository::new(Arc::new(api))
            .persist(&partition(), "clitsts1", &config)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn persist_transport_failure_is_indeterminate() {
        let mut api = MockManagementApi::new();
        api.expect_put_site_config().returning(|_, _, _| {
            Err(ApiError::transport(Method::Put, &config_path(), "connection reset"))
        });

        let err = ConfigRepository::new(Arc::new(api))
            .persist(&partition(), "clitsts1", &SiteConfig::default())
            .await
            .unwrap_err();
        assert!(err.write_may_have_applied());
    }

    #[tokio::test]
    async fn require_version_fails_closed_without_token() {
        let mut api = MockManagementApi::new();
        api.expect_put_site_config().never();

        let err = ConfigRepository::new(Arc::new(api))
            .with_concurrency(ConcurrencyMode::RequireVersion)
            .persist(&partition(), "clitsts1", &SiteConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.nothing_changed());
    }

    #[tokio::test]
    async fn backend_conflict_surfaces_as_conflict() {
        let mut api = MockManagementApi::new();
        api.expect_put_site_config()
            .returning(|_, _, _| Err(ApiError::conflict(&config_path(), "stale version 1")));

        let err = ConfigRepository::new(Arc::new(api))
            .with_concurrency(ConcurrencyMode::RequireVersion)
            .persist(&partition(), "clitsts1", &SiteConfig::default().with_version("1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn verify_ignores_version_bump() {
        let written = SiteConfig::default().with_version("1");
        let mut api = MockManagementApi::new();
        api.expect_get_site_config()
            .returning(|_, _| Ok(SiteConfig::default().with_version("2")));

        let verification = ConfigRepository::new(Arc::new(api))
            .verify(&partition(), "clitsts1", &written)
            .await
            .unwrap();
        assert!(verification.matches);
        assert_eq!(verification.config.version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn verify_accepts_emptied_collection_read_back_as_nil() {
        let written = SiteConfig {
            handler_mappings: Some(vec![]),
            php_version: Some("5.3".into()),
            ..SiteConfig::default()
        };
        let mut api = MockManagementApi::new();
        api.expect_get_site_config().returning(|_, _| {
            Ok(SiteConfig {
                php_version: Some("5.3".into()),
                ..SiteConfig::default()
            })
        });

        let verification = ConfigRepository::new(Arc::new(api))
            .verify(&partition(), "clitsts1", &written)
            .await
            .unwrap();
        assert!(verification.matches);
        assert_eq!(verification.config.handler_mappings, None);
    }

    #[tokio::test]
    async fn verify_reports_stale_read() {
        let written = SiteConfig {
            handler_mappings: Some(vec![HandlerMapping::new(".js", "node.exe")]),
            ..SiteConfig::default()
        };
        let mut api = MockManagementApi::new();
        api.expect_get_site_config()
            .returning(|_, _| Ok(SiteConfig::default()));

        let verification = ConfigRepository::new(Arc::new(api))
            .verify(&partition(), "clitsts1", &written)
            .await
            .unwrap();
        assert!(!verification.matches);
    }
}
