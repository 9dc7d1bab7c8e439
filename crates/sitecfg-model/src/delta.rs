//! Handler mapping deltas
//!
//! Provides [`HandlerMappingDelta`], a declarative add/remove instruction for
//! a single handler mapping. A delta is built from caller intent, consumed by
//! value exactly once by the merge engine, and gone afterwards.

use crate::config::HandlerMapping;
use std::fmt;

/// Declarative change to a site's handler mapping collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerMappingDelta {
    /// Add a mapping, replacing any mapping for the same extension in place
    Add(HandlerMapping),

    /// Remove the mapping for an extension
    ///
    /// Removing a mapping that does not exist is a no-op.
    Remove {
        /// Extension pattern to remove
        extension: String,
    },
}

impl HandlerMappingDelta {
    /// Add `extension -> script_processor`
    #[inline]
    #[must_use]
    pub fn add(extension: impl Into<String>, script_processor: impl Into<String>) -> Self {
        Self::Add(HandlerMapping::new(extension, script_processor))
    }

    /// Add a fully specified mapping
    #[inline]
    #[must_use]
    pub fn add_mapping(mapping: HandlerMapping) -> Self {
        Self::Add(mapping)
    }

    /// Remove the mapping for `extension`
    #[inline]
    #[must_use]
    pub fn remove(extension: impl Into<String>) -> Self {
        Self::Remove {
            extension: extension.into(),
        }
    }

    /// Extension pattern this delta targets
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        match self {
            Self::Add(mapping) => &mapping.extension,
            Self::Remove { extension } => extension,
        }
    }

    /// Check the delta is well formed
    ///
    /// # Errors
    /// - `DeltaError::EmptyExtension` if the extension pattern is blank
    /// - `DeltaError::EmptyScriptProcessor` if an add has a blank processor
    pub fn validate(&self) -> Result<(), DeltaError> {
        if self.extension().trim().is_empty() {
            return Err(DeltaError::EmptyExtension);
        }
        if let Self::Add(mapping) = self {
            if mapping.script_processor.trim().is_empty() {
                return Err(DeltaError::EmptyScriptProcessor {
                    extension: mapping.extension.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for HandlerMappingDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(m) => write!(f, "add {} -> {}", m.extension, m.script_processor),
            Self::Remove { extension } => write!(f, "remove {extension}"),
        }
    }
}

/// Malformed delta
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    /// Extension pattern is empty
    #[error("handler mapping extension must not be empty")]
    EmptyExtension,

    /// Script processor path is empty
    #[error("handler mapping for '{extension}' must name a script processor")]
    EmptyScriptProcessor { extension: String },
}
