//! Command-line surface

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Environment variable naming the store file
pub const STORE_ENV: &str = "SITECFG_STORE";

fn site_arg() -> Arg {
    Arg::new("site")
        .required(true)
        .help("Site name (matched case-insensitively)")
}

fn verify_arg() -> Arg {
    Arg::new("verify")
        .long("verify")
        .action(ArgAction::SetTrue)
        .help("Re-read the configuration after writing")
}

/// Build the `sitecfg` command tree
#[must_use]
pub fn build() -> Command {
    Command::new("sitecfg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Locate sites across webspaces and edit their handler mappings")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("store")
                .long("store")
                .env(STORE_ENV)
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Management store file (.json, .yaml or .yml)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Orchestrator configuration file (TOML)"),
        )
        .arg(
            Arg::new("fan-out")
                .long("fan-out")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Query up to N webspaces at once while locating"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("webspace")
                .about("Inspect webspaces")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list").about("List webspaces").arg(
                        Arg::new("geo-regions")
                            .long("geo-regions")
                            .action(ArgAction::SetTrue)
                            .help("List distinct geo regions instead"),
                    ),
                ),
        )
        .subcommand(
            Command::new("site")
                .about("Inspect sites")
                .subcommand_required(true)
                .subcommand(
                    Command::new("locate")
                        .about("Find the webspace holding a site")
                        .arg(site_arg()),
                ),
        )
        .subcommand(
            Command::new("handler")
                .about("Edit handler mappings")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list")
                        .about("Show the handler mappings of a site")
                        .arg(site_arg()),
                )
                .subcommand(
                    Command::new("add")
                        .about("Add or replace the mapping for an extension")
                        .arg(site_arg())
                        .arg(
                            Arg::new("extension")
                                .required(true)
                                .help("Extension pattern, e.g. .js"),
                        )
                        .arg(
                            Arg::new("processor")
                                .required(true)
                                .help("Script processor path"),
                        )
                        .arg(
                            Arg::new("arguments")
                                .long("arguments")
                                .allow_hyphen_values(true)
                                .help("Arguments passed to the processor"),
                        )
                        .arg(verify_arg()),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Remove every mapping for an extension")
                        .arg(site_arg())
                        .arg(
                            Arg::new("extension")
                                .required(true)
                                .help("Extension pattern, e.g. .js"),
                        )
                        .arg(verify_arg()),
                ),
        )
}
