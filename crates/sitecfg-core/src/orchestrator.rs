//! Update orchestrator
//!
//! Turns "change site S by adding or removing one handler mapping" into
//! locate -> fetch -> merge -> persist -> (optionally) verify.
//!
//! Each invocation owns its document snapshot end to end and shares no
//! mutable state with other invocations. The write is never retried.

use crate::client::{ManagementApi, TimeoutApi};
use crate::error::SiteError;
use crate::locator::ResourceLocator;
use crate::repository::ConfigRepository;
use crate::types::{LocatedSite, OperationId, OrchestratorConfig, UpdateOptions, UpdateReport};
use sitecfg_model::{apply_handler_mapping_delta, HandlerMapping, HandlerMappingDelta, SiteConfig};
use std::sync::Arc;
use tracing::Instrument;

/// Composes locator, repository and merge engine
#[derive(Clone)]
pub struct UpdateOrchestrator {
    /// Configuration
    config: OrchestratorConfig,
    /// Finds the owning webspace
    locator: ResourceLocator,
    /// Reads and writes documents
    repository: ConfigRepository,
}

impl UpdateOrchestrator {
    /// Create an orchestrator over a management client
    ///
    /// When the configuration sets a call timeout, every remote call is
    /// bounded by it.
    #[must_use]
    pub fn new(api: Arc<dyn ManagementApi>, config: OrchestratorConfig) -> Self {
        let api: Arc<dyn ManagementApi> = match config.call_timeout() {
            Some(timeout) => Arc::new(TimeoutApi::new(api, timeout)),
            None => api,
        };

        let locator = ResourceLocator::new(Arc::clone(&api))
            .with_strategy(config.search)
            .with_properties(config.site_properties.iter().copied());
        let repository = ConfigRepository::new(api).with_concurrency(config.concurrency);

        Self {
            config,
            locator,
            repository,
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Get locator
    #[inline]
    #[must_use]
    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Find the webspace that holds a site
    ///
    /// # Errors
    /// See [`ResourceLocator::locate`].
    pub async fn locate(&self, name: &str) -> Result<LocatedSite, SiteError> {
        self.locator.locate(name).await
    }

    /// Locate a site and read its configuration
    ///
    /// # Errors
    /// Locate or fetch failures, unchanged.
    pub async fn fetch_config(&self, name: &str) -> Result<(LocatedSite, SiteConfig), SiteError> {
        let located = self.locator.locate(name).await?;
        let config = self
            .repository
            .fetch(&located.partition, &located.site.name)
            .await?;
        Ok((located, config))
    }

    /// Current handler mappings of a site
    ///
    /// # Errors
    /// Locate or fetch failures, unchanged.
    pub async fn list_handler_mappings(&self, name: &str) -> Result<Vec<HandlerMapping>, SiteError> {
        let (_, config) = self.fetch_config(name).await?;
        Ok(config.handler_mappings().to_vec())
    }

    /// Apply a handler mapping change with the configured options
    ///
    /// Returns the merged document, or the re-read one when the
    /// configuration asks for verification.
    ///
    /// # Errors
    /// See [`apply_handler_mapping_with`](Self::apply_handler_mapping_with).
    pub async fn apply_handler_mapping(
        &self,
        name: &str,
        delta: HandlerMappingDelta,
    ) -> Result<SiteConfig, SiteError> {
        let options = UpdateOptions::from_config(&self.config);
        self.apply_handler_mapping_with(name, delta, options)
            .await
            .map(|report| report.config)
    }

    /// Apply a handler mapping change
    ///
    /// # Workflow
    /// 1. Validate the delta (no remote call on a malformed delta)
    /// 2. Locate the owning webspace
    /// 3. Fetch the full document
    /// 4. Merge the delta
    /// 5. Persist the full document
    /// 6. Re-read, if `options.verify`
    ///
    /// # Errors
    /// The originating error kind, unconverted. A `Transport` error at
    /// `PersistConfig` means the remote state is unknown.
    pub async fn apply_handler_mapping_with(
        &self,
        name: &str,
        delta: HandlerMappingDelta,
        options: UpdateOptions,
    ) -> Result<UpdateReport, SiteError> {
        let operation = OperationId::new();
        let span = tracing::info_span!(
            "apply_handler_mapping",
            %operation,
            site = name,
            change = %delta
        );
        self.run(operation, name, delta, options)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        operation: OperationId,
        name: &str,
        delta: HandlerMappingDelta,
        options: UpdateOptions,
    ) -> Result<UpdateReport, SiteError> {
        delta.validate()?;

        // 1. Locate
        let located = self.locator.locate(name).await?;
        let site = located.site.name.clone();

        // 2. Fetch
        let current = self.repository.fetch(&located.partition, &site).await?;
        tracing::debug!(mappings = current.handler_mappings().len(), "fetched configuration");

        // 3. Merge
        let outcome = apply_handler_mapping_delta(&current, delta)?;
        tracing::info!(change = ?outcome.change, "merged handler mapping");

        if options.skip_unchanged && outcome.is_unchanged() {
            tracing::info!("merge changed nothing; write skipped");
            return Ok(UpdateReport {
                operation,
                located,
                change: outcome.change,
                written: false,
                verified: None,
                config: outcome.config,
            });
        }

        // 4. Persist
        self.repository
            .persist(&located.partition, &site, &outcome.config)
            .await?;

        // 5. Verify
        let (config, verified) = if options.verify {
            let verification = self
                .repository
                .verify(&located.partition, &site, &outcome.config)
                .await?;
            (verification.config, Some(verification.matches))
        } else {
            (outcome.config, None)
        };

        Ok(UpdateReport {
            operation,
            located,
            change: outcome.change,
            written: true,
            verified,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiError, Method, MockManagementApi, ResourcePath};
    use crate::error::{ErrorKind, Stage};
    use mockall::Sequence;
    use sitecfg_model::{MappingChange, Partition, Site};

    fn expect_located(api: &mut MockManagementApi) {
        api.expect_list_webspaces()
            .returning(|| Ok(vec![Partition::new("eastuswebspace")]));
        api.expect_list_sites()
            .returning(|ws, _| Ok(vec![Site::new("clitsts1", ws)]));
    }

    #[tokio::test]
    async fn calls_run_in_order_read_then_write() {
        let mut api = MockManagementApi::new();
        let mut seq = Sequence::new();
        api.expect_list_webspaces()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![Partition::new("eastuswebspace")]));
        api.expect_list_sites()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|ws, _| Ok(vec![Site::new("clitsts1", ws)]));
        api.expect_get_site_config()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(SiteConfig::default()));
        api.expect_put_site_config()
            .withf(|_, _, sent| sent.handler_mappings().len() == 1)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let orchestrator = UpdateOrchestrator::new(Arc::new(api), OrchestratorConfig::new());
        let config = orchestrator
            .apply_handler_mapping("clitsts1", HandlerMappingDelta::add(".js", "node.exe"))
            .await
            .unwrap();

        assert_eq!(config.handler_mappings(), &[HandlerMapping::new(".js", "node.exe")]);
    }

    #[tokio::test]
    async fn invalid_delta_makes_no_remote_call() {
        let api = MockManagementApi::new();
        let orchestrator = UpdateOrchestrator::new(Arc::new(api), OrchestratorConfig::new());

        let err = orchestrator
            .apply_handler_mapping("clitsts1", HandlerMappingDelta::add("", "proc"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn persist_failure_is_not_retried() {
        let mut api = MockManagementApi::new();
        expect_located(&mut api);
        api.expect_get_site_config()
            .returning(|_, _| Ok(SiteConfig::default()));
        api.expect_put_site_config().times(1).returning(|ws, site, _| {
            Err(ApiError::transport(
                Method::Put,
                &ResourcePath::SiteConfig {
                    webspace: ws.to_string(),
                    site: site.to_string(),
                },
                "connection reset",
            ))
        });

        let err = UpdateOrchestrator::new(Arc::new(api), OrchestratorConfig::new())
            .apply_handler_mapping("clitsts1", HandlerMappingDelta::add(".js", "node.exe"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.stage(), Some(Stage::PersistConfig));
        assert!(err.write_may_have_applied());
    }

    #[tokio::test]
    async fn skip_unchanged_avoids_write() {
        let mut api = MockManagementApi::new();
        expect_located(&mut api);
        api.expect_get_site_config()
            .returning(|_, _| Ok(SiteConfig::default()));
        api.expect_put_site_config().never();

        let report = UpdateOrchestrator::new(Arc::new(api), OrchestratorConfig::new())
            .apply_handler_mapping_with(
                "clitsts1",
                HandlerMappingDelta::remove(".js"),
                UpdateOptions {
                    skip_unchanged: true,
                    ..UpdateOptions::default()
                },
            )
            .await
            .unwrap();

        assert!(!report.written);
        assert_eq!(report.change, MappingChange::Unchanged);
    }

    #[tokio::test]
    async fn unchanged_remove_still_writes_by_default() {
        let mut api = MockManagementApi::new();
        expect_located(&mut api);
        api.expect_get_site_config()
            .returning(|_, _| Ok(SiteConfig::default()));
        api.expect_put_site_config()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let report = UpdateOrchestrator::new(Arc::new(api), OrchestratorConfig::new())
            .apply_handler_mapping_with(
                "clitsts1",
                HandlerMappingDelta::remove(".js"),
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert!(report.written);
    }

    #[tokio::test]
    async fn verify_returns_reread_document() {
        let mut api = MockManagementApi::new();
        expect_located(&mut api);
        let mut reads = 0;
        api.expect_get_site_config().times(2).returning(move |_, _| {
            reads += 1;
            if reads == 1 {
                Ok(SiteConfig::default())
            } else {
                Ok(SiteConfig {
                    handler_mappings: Some(vec![HandlerMapping::new(".js", "node.exe")]),
                    php_version: Some("5.4".into()),
                    ..SiteConfig::default()
                })
            }
        });
        api.expect_put_site_config()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let report = UpdateOrchestrator::new(Arc::new(api), OrchestratorConfig::new())
            .apply_handler_mapping_with(
                "clitsts1",
                HandlerMappingDelta::add(".js", "node.exe"),
                UpdateOptions::default().verified(),
            )
            .await
            .unwrap();

        // Another writer changed PhpVersion between write and re-read.
        assert_eq!(report.verified, Some(false));
        assert_eq!(report.config.php_version.as_deref(), Some("5.4"));
    }

    #[tokio::test]
    async fn list_handler_mappings_reads_only() {
        let mut api = MockManagementApi::new();
        expect_located(&mut api);
        api.expect_get_site_config().returning(|_, _| {
            Ok(SiteConfig {
                handler_mappings: Some(vec![HandlerMapping::new(".php", "php-cgi.exe")]),
                ..SiteConfig::default()
            })
        });
        api.expect_put_site_config().never();

        let mappings = UpdateOrchestrator::new(Arc::new(api), OrchestratorConfig::new())
            .list_handler_mappings("clitsts1")
            .await
            .unwrap();
        assert_eq!(mappings, vec![HandlerMapping::new(".php", "php-cgi.exe")]);
    }
}
