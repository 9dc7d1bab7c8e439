//! Subcommand handlers
//!
//! Each handler runs against an [`UpdateOrchestrator`] over the in-memory
//! store and renders either human text or JSON.

use anyhow::{bail, Result};
use clap::ArgMatches;
use serde_json::json;
use sitecfg_core::{SiteError, UpdateOptions, UpdateOrchestrator, UpdateReport};
use sitecfg_model::{HandlerMapping, HandlerMappingDelta, MappingChange};
use std::fmt::Write;

/// What a command printed and whether it may have written the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub text: String,
    pub store_touched: bool,
}

impl Output {
    fn read_only(text: String) -> Self {
        Self {
            text,
            store_touched: false,
        }
    }
}

/// Dispatch a leaf command
///
/// # Errors
/// Returns the orchestrator error unchanged (wrapped in `anyhow`) so the
/// caller can recover the [`SiteError`].
pub async fn dispatch(
    orchestrator: &UpdateOrchestrator,
    path: &[&str],
    args: &ArgMatches,
    json: bool,
) -> Result<Output> {
    match path {
        ["webspace", "list"] => webspace_list(orchestrator, args, json).await,
        ["site", "locate"] => site_locate(orchestrator, args, json).await,
        ["handler", "list"] => handler_list(orchestrator, args, json).await,
        ["handler", "add"] => {
            let mut mapping = HandlerMapping::new(arg(args, "extension"), arg(args, "processor"));
            if let Some(arguments) = args.get_one::<String>("arguments") {
                mapping = mapping.with_arguments(arguments.clone());
            }
            handler_change(orchestrator, args, HandlerMappingDelta::add_mapping(mapping), json)
                .await
        }
        ["handler", "delete"] => {
            let delta = HandlerMappingDelta::remove(arg(args, "extension"));
            handler_change(orchestrator, args, delta, json).await
        }
        other => bail!("unknown command: {}", other.join(" ")),
    }
}

fn arg(args: &ArgMatches, id: &str) -> String {
    args.get_one::<String>(id).cloned().unwrap_or_default()
}

async fn webspace_list(
    orchestrator: &UpdateOrchestrator,
    args: &ArgMatches,
    json: bool,
) -> Result<Output> {
    let directory = orchestrator.locator().directory();

    if args.get_flag("geo-regions") {
        let regions = directory.list_geo_regions().await?;
        let text = if json {
            serde_json::to_string_pretty(&regions)?
        } else {
            regions
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };
        return Ok(Output::read_only(text));
    }

    let partitions = directory.list_partitions().await?;
    let text = if json {
        serde_json::to_string_pretty(&partitions)?
    } else {
        let mut text = String::new();
        for p in &partitions {
            let status: String = p.status.clone().into();
            writeln!(
                text,
                "{}\t{}\t{}",
                p.name,
                p.geo_region.as_deref().unwrap_or("-"),
                status
            )?;
        }
        text.trim_end().to_string()
    };
    Ok(Output::read_only(text))
}

async fn site_locate(
    orchestrator: &UpdateOrchestrator,
    args: &ArgMatches,
    json: bool,
) -> Result<Output> {
    let located = orchestrator.locate(&arg(args, "site")).await?;
    let text = if json {
        serde_json::to_string_pretty(&json!({
            "webspace": located.partition,
            "site": located.site,
        }))?
    } else {
        format!("{} is in {}", located.site.name, located.partition)
    };
    Ok(Output::read_only(text))
}

async fn handler_list(
    orchestrator: &UpdateOrchestrator,
    args: &ArgMatches,
    json: bool,
) -> Result<Output> {
    let mappings = orchestrator
        .list_handler_mappings(&arg(args, "site"))
        .await?;
    let text = if json {
        serde_json::to_string_pretty(&mappings)?
    } else if mappings.is_empty() {
        "no handler mappings".to_string()
    } else {
        mappings
            .iter()
            .map(describe_mapping)
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Output::read_only(text))
}

async fn handler_change(
    orchestrator: &UpdateOrchestrator,
    args: &ArgMatches,
    delta: HandlerMappingDelta,
    json: bool,
) -> Result<Output> {
    let options = UpdateOptions::from_config(orchestrator.config());

    let report = match orchestrator
        .apply_handler_mapping_with(&arg(args, "site"), delta, options)
        .await
    {
        Ok(report) => report,
        Err(err) => return Err(StoreTouched::wrap(err)),
    };

    let text = if json {
        serde_json::to_string_pretty(&report_json(&report))?
    } else {
        render_report(&report)?
    };
    Ok(Output {
        text,
        store_touched: report.written,
    })
}

fn describe_mapping(mapping: &HandlerMapping) -> String {
    match &mapping.arguments {
        Some(arguments) => format!(
            "{} -> {} {}",
            mapping.extension, mapping.script_processor, arguments
        ),
        None => format!("{} -> {}", mapping.extension, mapping.script_processor),
    }
}

fn describe_change(change: &MappingChange) -> String {
    match change {
        MappingChange::Added => "added".to_string(),
        MappingChange::Replaced { previous } => {
            format!("replaced ({})", describe_mapping(previous))
        }
        MappingChange::Removed { previous } => format!("removed {}", previous.len()),
        MappingChange::Unchanged => "unchanged".to_string(),
    }
}

fn render_report(report: &UpdateReport) -> Result<String> {
    let mut text = format!(
        "{}: {} in {}",
        report.located.site.name,
        describe_change(&report.change),
        report.located.partition.name
    );
    match report.verified {
        Some(true) => text.push_str(" (verified)"),
        Some(false) => text.push_str(" (re-read differs from what was written)"),
        None => {}
    }
    for mapping in report.config.handler_mappings() {
        write!(text, "\n  {}", describe_mapping(mapping))?;
    }
    Ok(text)
}

fn report_json(report: &UpdateReport) -> serde_json::Value {
    json!({
        "operation": report.operation.to_string(),
        "site": report.located.site.name,
        "webspace": report.located.partition.name,
        "change": describe_change(&report.change),
        "written": report.written,
        "verified": report.verified,
        "handler_mappings": report.config.handler_mappings,
    })
}

/// Marks an orchestrator failure after which the store may hold a write
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct StoreTouched(pub SiteError);

impl StoreTouched {
    fn wrap(err: SiteError) -> anyhow::Error {
        if err.nothing_changed() {
            err.into()
        } else {
            Self(err).into()
        }
    }
}

/// Find the [`SiteError`] behind a command failure, if any
#[must_use]
pub fn site_error(err: &anyhow::Error) -> Option<&SiteError> {
    err.downcast_ref::<SiteError>()
        .or_else(|| err.downcast_ref::<StoreTouched>().map(|t| &t.0))
}
