//! sitecfg Core
//!
//! Discovers where a site lives and applies handler mapping changes to its
//! configuration document:
//! - Lists the webspaces of the subscription
//! - Locates the webspace holding a named site
//! - Reads and writes the whole configuration document
//! - Composes those steps into a read-modify-write update
//!
//! # Example
//!
//! ```rust,ignore
//! use sitecfg_core::{InMemoryManagementApi, OrchestratorConfig, UpdateOrchestrator};
//! use sitecfg_model::HandlerMappingDelta;
//! use std::sync::Arc;
//!
//! # async fn example(api: Arc<InMemoryManagementApi>) -> Result<(), sitecfg_core::SiteError> {
//! let orchestrator = UpdateOrchestrator::new(api, OrchestratorConfig::new());
//!
//! let config = orchestrator
//!     .apply_handler_mapping("clitsts1", HandlerMappingDelta::add(".js", "c:\\node.exe"))
//!     .await?;
//!
//! println!("{} handler mappings", config.handler_mappings().len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod client;
pub mod directory;
pub mod error;
pub mod locator;
pub mod memory;
pub mod orchestrator;
pub mod repository;
pub mod types;

// Re-exports for convenience
pub use client::{ApiError, ManagementApi, Method, ResourcePath, SiteQuery, TimeoutApi};
pub use directory::PartitionDirectory;
pub use error::{ErrorKind, SiteError, Stage};
pub use locator::ResourceLocator;
pub use memory::{InMemoryManagementApi, SiteRecord, StoreSnapshot};
pub use orchestrator::UpdateOrchestrator;
pub use repository::{ConfigRepository, Verification};
pub use types::{
    ConcurrencyMode, LocatedSite, OperationId, OrchestratorConfig, SearchStrategy, UpdateOptions,
    UpdateReport,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sitecfg Core
    pub use crate::{
        ManagementApi, OrchestratorConfig, SearchStrategy, SiteError, UpdateOptions,
        UpdateOrchestrator,
    };
    pub use sitecfg_model::{HandlerMapping, HandlerMappingDelta, SiteConfig};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
