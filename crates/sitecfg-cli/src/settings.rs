//! Run settings resolved from flags, environment and the config file

use anyhow::{Context, Result};
use clap::ArgMatches;
use sitecfg_core::{OrchestratorConfig, SearchStrategy};
use std::path::{Path, PathBuf};

/// Everything a command needs besides its own arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store: PathBuf,
    pub orchestrator: OrchestratorConfig,
    pub json: bool,
}

impl Settings {
    /// Resolve settings from parsed arguments
    ///
    /// Flags override the config file, which overrides defaults.
    ///
    /// # Errors
    /// Fails if no store is given or the config file does not load.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let store = matches
            .get_one::<PathBuf>("store")
            .cloned()
            .context("no store given; pass --store or set SITECFG_STORE")?;

        let mut orchestrator = match matches.get_one::<PathBuf>("config") {
            Some(path) => load_config(path)?,
            None => OrchestratorConfig::new(),
        };
        if let Some(&max_in_flight) = matches.get_one::<usize>("fan-out") {
            orchestrator.search = SearchStrategy::FanOut { max_in_flight };
        }
        if flag(matches, "verify") {
            orchestrator.verify_after_write = true;
        }

        Ok(Self {
            store,
            orchestrator,
            json: matches.get_flag("json"),
        })
    }
}

/// Parse an orchestrator configuration file
///
/// # Errors
/// Fails if the file cannot be read or is not valid TOML for the config.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Flag lookup that tolerates commands not defining it
fn flag(matches: &ArgMatches, id: &str) -> bool {
    matches
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}
