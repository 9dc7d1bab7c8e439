//! Handler mapping merge engine
//!
//! Applies one [`HandlerMappingDelta`] to a [`SiteConfig`] and returns a new
//! document. The input is borrowed immutably; the output is a clone in which
//! only `HandlerMappings` may differ.
//!
//! # Invariants
//! - Extension patterns are unique in the result of an add
//! - Every field other than `HandlerMappings` is copied by value
//! - Mappings not targeted by the delta keep their relative order

use crate::config::{HandlerMapping, SiteConfig};
use crate::delta::{DeltaError, HandlerMappingDelta};

/// What a merge did to the mapping collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingChange {
    /// Mapping appended
    Added,
    /// Existing mapping overwritten in place
    Replaced { previous: HandlerMapping },
    /// Matching mappings dropped
    Removed { previous: Vec<HandlerMapping> },
    /// Document identical to the input
    Unchanged,
}

/// Result of applying a delta
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The merged document
    pub config: SiteConfig,
    /// Effect on the mapping collection
    pub change: MappingChange,
}

impl MergeOutcome {
    /// Whether the merged document equals the input
    #[inline]
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.change == MappingChange::Unchanged
    }

    /// Take the merged document
    #[inline]
    #[must_use]
    pub fn into_config(self) -> SiteConfig {
        self.config
    }
}

/// Apply a handler mapping delta to a configuration document
///
/// # Errors
/// Returns `DeltaError` if the delta is malformed; the input is untouched.
pub fn apply_handler_mapping_delta(
    config: &SiteConfig,
    delta: HandlerMappingDelta,
) -> Result<MergeOutcome, DeltaError> {
    delta.validate()?;

    let outcome = match delta {
        HandlerMappingDelta::Add(mapping) => add_mapping(config, normalize(mapping)),
        HandlerMappingDelta::Remove { extension } => remove_mapping(config, &extension),
    };
    Ok(outcome)
}

fn normalize(mut mapping: HandlerMapping) -> HandlerMapping {
    mapping.extension = mapping.extension.trim().to_string();
    mapping.script_processor = mapping.script_processor.trim().to_string();
    mapping
}

fn add_mapping(config: &SiteConfig, mapping: HandlerMapping) -> MergeOutcome {
    let mut merged = config.clone();
    let mappings = merged.handler_mappings.get_or_insert_with(Vec::new);

    let Some(idx) = mappings
        .iter()
        .position(|m| m.matches_extension(&mapping.extension))
    else {
        mappings.push(mapping);
        return MergeOutcome {
            config: merged,
            change: MappingChange::Added,
        };
    };

    let previous = std::mem::replace(&mut mappings[idx], mapping);
    let before = mappings.len();

    // Later duplicates of the same pattern break uniqueness; the first wins.
    let extension = mappings[idx].extension.clone();
    let mut position = 0;
    mappings.retain(|m| {
        let keep = position <= idx || !m.matches_extension(&extension);
        position += 1;
        keep
    });

    let change = if previous == mappings[idx] && mappings.len() == before {
        MappingChange::Unchanged
    } else {
        MappingChange::Replaced { previous }
    };
    MergeOutcome {
        config: merged,
        change,
    }
}

fn remove_mapping(config: &SiteConfig, extension: &str) -> MergeOutcome {
    let unchanged = || MergeOutcome {
        config: config.clone(),
        change: MappingChange::Unchanged,
    };

    let Some(mappings) = config.handler_mappings.as_ref() else {
        return unchanged();
    };
    let (removed, kept): (Vec<_>, Vec<_>) = mappings
        .iter()
        .cloned()
        .partition(|m| m.matches_extension(extension));
    if removed.is_empty() {
        return unchanged();
    }

    // An emptied collection stays an empty list, never nil.
    let mut merged = config.clone();
    merged.handler_mappings = Some(kept);
    MergeOutcome {
        config: merged,
        change: MappingChange::Removed { previous: removed },
    }
}
