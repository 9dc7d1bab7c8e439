//! Error types for sitecfg Core
//!
//! Every component surfaces errors to its caller immediately; nothing here is
//! retried. Each error records the [`Stage`] it came from so a caller can
//! tell "nothing changed" apart from "a write may have partially applied".

use crate::client::ApiError;
use sitecfg_model::{ConfigError, DeltaError};
use std::fmt;

/// Step of an update at which an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Listing webspaces
    ListPartitions,
    /// Listing geo regions
    ListGeoRegions,
    /// Querying a webspace for the site
    LocateSite,
    /// Reading the configuration document
    FetchConfig,
    /// Writing the merged document
    PersistConfig,
    /// Re-reading after the write
    VerifyConfig,
}

impl Stage {
    /// Whether this stage runs after the write was sent
    #[inline]
    #[must_use]
    pub fn is_after_write(self) -> bool {
        matches!(self, Self::VerifyConfig)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ListPartitions => "listing webspaces",
            Self::ListGeoRegions => "listing geo regions",
            Self::LocateSite => "locating site",
            Self::FetchConfig => "fetching configuration",
            Self::PersistConfig => "writing configuration",
            Self::VerifyConfig => "verifying configuration",
        })
    }
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    NotFound,
    Conflict,
    Validation,
}

/// Main sitecfg error type
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Network or protocol failure
    #[error("transport failure while {stage}: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: ApiError,
    },

    /// No webspace holds a site of that name
    #[error("site '{name}' not found across {partitions_searched} webspaces")]
    SiteNotFound {
        name: String,
        partitions_searched: usize,
    },

    /// A webspace or document vanished mid-operation
    #[error("not found while {stage}: {source}")]
    NotFound {
        stage: Stage,
        #[source]
        source: ApiError,
    },

    /// Concurrent modification detected, or a write refused for lack of a token
    #[error("conflict while {stage} for site '{site}': {reason}")]
    Conflict {
        stage: Stage,
        site: String,
        reason: String,
    },

    /// Malformed delta
    #[error("invalid handler mapping change: {0}")]
    Validation(#[from] DeltaError),

    /// A configuration document could not be encoded
    #[error("unencodable configuration while {stage}: {source}")]
    Document {
        stage: Stage,
        #[source]
        source: ConfigError,
    },
}

impl SiteError {
    /// Classify a collaborator failure at a given stage
    #[must_use]
    pub fn from_api(stage: Stage, site: &str, error: ApiError) -> Self {
        match error {
            ApiError::Transport { .. } => Self::Transport {
                stage,
                source: error,
            },
            ApiError::NotFound { .. } => Self::NotFound {
                stage,
                source: error,
            },
            ApiError::Conflict { message, .. } => Self::Conflict {
                stage,
                site: site.to_string(),
                reason: message,
            },
        }
    }

    /// Coarse classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::SiteNotFound { .. } | Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Validation(_) | Self::Document { .. } => ErrorKind::Validation,
        }
    }

    /// Stage the error surfaced at, if it came from a remote call
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Transport { stage, .. }
            | Self::NotFound { stage, .. }
            | Self::Conflict { stage, .. }
            | Self::Document { stage, .. } => Some(*stage),
            Self::SiteNotFound { .. } => Some(Stage::LocateSite),
            Self::Validation(_) => None,
        }
    }

    /// The write was sent and its outcome is unknown
    #[inline]
    #[must_use]
    pub fn write_may_have_applied(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                stage: Stage::PersistConfig,
                ..
            }
        )
    }

    /// The remote configuration is known to be untouched
    ///
    /// False for an indeterminate write and for failures after a successful
    /// write.
    #[inline]
    #[must_use]
    pub fn nothing_changed(&self) -> bool {
        !self.write_may_have_applied() && !self.stage().is_some_and(Stage::is_after_write)
    }

    /// Message suitable for an operator
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.write_may_have_applied() {
            return format!(
                "{self}. The remote configuration may now differ from both the original \
                 and the requested change; fetch it again to check before retrying."
            );
        }
        match self {
            Self::Conflict { site, .. } => format!(
                "{self}. Another writer changed '{site}'; fetch it again and re-apply the change."
            ),
            Self::Transport {
                stage: Stage::VerifyConfig,
                ..
            } => format!("{self}. The change was written but could not be re-read."),
            _ => self.to_string(),
        }
    }
}
