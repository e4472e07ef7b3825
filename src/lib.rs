use std::path::PathBuf;

use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use miette::{Diagnostic, Result};

use crate::{
    commands::jira::Mode,
    config::{ConfigLoader, GerritArgs, JiraArgs, CONFIG_PATH},
};

mod app_config;
mod commands;
mod config;
mod integrations;
mod jql;
mod prompt;
mod report;
mod stats;

/// Parse the command line, set up logging and run the chosen subcommand.
///
/// ## Errors
/// 1. A required setting is neither passed nor configured
/// 2. Jira rejects the credentials or can't be reached to log in
/// 3. A URL is invalid
pub async fn run() -> Result<()> {
    let matches = build_cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    let config = ConfigLoader::load_or_default(&config_path);
    let timeout = matches.get_one::<u64>("timeout").copied();

    match matches.subcommand() {
        Some(("jira", sub_matches)) => {
            let settings = JiraArgs {
                url: string(sub_matches, "url"),
                project: string(sub_matches, "project"),
                component: string(sub_matches, "component"),
                prefix: string(sub_matches, "prefix"),
                team: strings(sub_matches, "team"),
                years: sub_matches.get_one::<u16>("years").copied(),
                timeout,
            }
            .resolve(&config)
            .map_err(Error::from)?;
            let mode = if sub_matches.get_flag("test") {
                Mode::SelfTest
            } else if let Some(jql) = string(sub_matches, "jql") {
                Mode::Jql(jql)
            } else {
                Mode::Report
            };
            commands::jira::run(
                settings,
                string(sub_matches, "username"),
                string(sub_matches, "password"),
                mode,
            )
            .await
            .map_err(Error::from)?;
        }
        Some(("gerrit", sub_matches)) => {
            let settings = GerritArgs {
                urls: strings(sub_matches, "url"),
                team: strings(sub_matches, "team"),
                years: sub_matches.get_one::<u16>("years").copied(),
                timeout,
            }
            .resolve(&config)
            .map_err(Error::from)?;
            commands::gerrit::run(settings).await.map_err(Error::from)?;
        }
        _ => {}
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn strings(matches: &ArgMatches, id: &str) -> Option<Vec<String>> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
}

fn team_arg() -> Arg {
    Arg::new("team")
        .long("team")
        .num_args(1..)
        .action(ArgAction::Append)
        .value_name("NAME")
        .help("Who to collect statistics for, overriding `team` in the config file")
}

fn years_arg() -> Arg {
    Arg::new("years")
        .long("years")
        .value_name("N")
        .value_parser(value_parser!(u16).range(1..))
        .help("How many years to look back, including the current one [default: 5]")
}

fn build_cli() -> Command {
    command!()
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log more: once for progress, twice for every request. RUST_LOG overrides this."),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .env("GOJIRA_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .default_value(CONFIG_PATH)
                .global(true)
                .help("The TOML file to read settings from"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .value_parser(value_parser!(u64).range(1..))
                .global(true)
                .help("How long to wait for each request [default: 30]"),
        )
        .subcommand(
            Command::new("jira")
                .about("Yearly created/resolved issue counts per team member and per label, plus effort estimates per label")
                .arg(Arg::new("url").long("url").help("Base URL of the Jira instance"))
                .arg(Arg::new("project").long("project").help("Key of the project to report on"))
                .arg(
                    Arg::new("component")
                        .long("component")
                        .help("Component that label statistics and estimates are limited to"),
                )
                .arg(
                    Arg::new("prefix")
                        .long("prefix")
                        .help("Only report on labels starting with this"),
                )
                .arg(team_arg())
                .arg(years_arg())
                .arg(
                    Arg::new("username")
                        .short('u')
                        .long("username")
                        .help("Jira username [default: the current OS user]"),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Jira password, prompted for when left out"),
                )
                .arg(
                    Arg::new("jql")
                        .long("jql")
                        .value_name("QUERY")
                        .help("Only print the number of issues matching this JQL"),
                )
                .arg(
                    Arg::new("test")
                        .short('t')
                        .long("test")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("jql")
                        .help("Check connectivity by calling each Jira endpoint once and printing the responses"),
                ),
        )
        .subcommand(
            Command::new("gerrit")
                .about("Merged, new and abandoned changes per team member and year")
                .arg(
                    Arg::new("url")
                        .long("url")
                        .num_args(1..)
                        .action(ArgAction::Append)
                        .help("Base URL of each Gerrit server to report on"),
                )
                .arg(team_arg())
                .arg(years_arg()),
        )
}

#[derive(Debug, Diagnostic, thiserror::Error)]
enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Jira(#[from] commands::jira::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Gerrit(#[from] integrations::gerrit::Error),
}
