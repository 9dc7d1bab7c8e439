//! sitecfg CLI
//!
//! `sitecfg [--store PATH] [--config PATH] [--log-json] <command>` drives the
//! update orchestrator over a management store kept in a JSON or YAML file.
//! The file is rewritten only when a command may have written to the store.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod settings;
pub mod store;

pub use commands::{site_error, Output, StoreTouched};
pub use settings::Settings;
pub use store::{StoreFile, StoreFormat};

use anyhow::Result;
use clap::ArgMatches;
use sitecfg_core::{ConcurrencyMode, InMemoryManagementApi, UpdateOrchestrator};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Subcommand names down to the leaf, and the leaf's matches
#[must_use]
pub fn leaf_command(matches: &ArgMatches) -> (Vec<&str>, &ArgMatches) {
    let mut path = Vec::new();
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        path.push(name);
        current = sub;
    }
    (path, current)
}

/// Install the stderr subscriber (`RUST_LOG`, default `warn`)
pub fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Run a parsed command line against its store
///
/// # Errors
/// Store I/O failures, config failures, or the orchestrator's error (see
/// [`site_error`]).
pub async fn run(matches: &ArgMatches) -> Result<String> {
    let (path, leaf) = leaf_command(matches);
    let settings = Settings::from_matches(leaf)?;

    let file = StoreFile::new(&settings.store);
    let snapshot = file.load()?;
    let store = Arc::new(match settings.orchestrator.concurrency {
        ConcurrencyMode::RequireVersion => InMemoryManagementApi::versioned(snapshot),
        ConcurrencyMode::LastWriterWins => InMemoryManagementApi::new(snapshot),
    });
    let orchestrator = UpdateOrchestrator::new(store.clone(), settings.orchestrator.clone());

    let result = commands::dispatch(&orchestrator, &path, leaf, settings.json).await;
    let touched = match &result {
        Ok(output) => output.store_touched,
        Err(err) => err.downcast_ref::<StoreTouched>().is_some(),
    };
    if touched {
        file.save(&store.snapshot())?;
    }

    result.map(|output| output.text)
}

/// Text to print for a failed command
#[must_use]
pub fn failure_message(err: &anyhow::Error) -> String {
    match site_error(err) {
        Some(site) => site.user_message(),
        None => format!("{err:#}"),
    }
}
