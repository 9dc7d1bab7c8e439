//! sitecfg Model
//!
//! Webspaces, sites and the whole-document site configuration, plus the
//! merge engine that applies a single handler mapping change to a document.
//!
//! # Core Concepts
//!
//! - [`Partition`]: A regional webspace that hosts sites
//! - [`Site`]: A hosted application discovered inside a webspace
//! - [`SiteConfig`]: The full configuration document, read and written whole
//! - [`HandlerMappingDelta`]: Add or remove one handler mapping
//! - [`apply_handler_mapping_delta`]: Merge a delta into a document
//! - [`ConfigFingerprint`]: Blake3 digest of a document's canonical form
//!
//! # Example
//!
//! ```rust
//! use sitecfg_model::{apply_handler_mapping_delta, HandlerMappingDelta, SiteConfig};
//!
//! let config = SiteConfig::default();
//! let outcome = apply_handler_mapping_delta(
//!     &config,
//!     HandlerMappingDelta::add(".js", "c:\\node\\node.exe"),
//! )?;
//! assert_eq!(outcome.config.handler_mappings().len(), 1);
//! # Ok::<(), sitecfg_model::DeltaError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod delta;
mod hash;
mod merge;
mod partition;
mod site;

pub use config::{ConfigError, ConnectionString, HandlerMapping, NameValuePair, SiteConfig};
pub use delta::{DeltaError, HandlerMappingDelta};
pub use hash::ConfigFingerprint;
pub use merge::{apply_handler_mapping_delta, MappingChange, MergeOutcome};
pub use partition::{GeoRegion, Partition, PartitionStatus};
pub use site::{Site, SiteProperty, SiteState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
