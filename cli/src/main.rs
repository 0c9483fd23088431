//! # The Worklog Synchronisation Command Line Utility
//!
//! Moves tracked time from a time tracker (Toggl, Gitlab, Jira) into an issue
//! tracker (Jira, Gitlab, Odoo). Every synchronisation is kept in a local database,
//! so it can be reviewed and corrected before anything is sent.
//!
//! ## Configuration
//! Create the configuration file and add your provider accounts to it:
//! ```bash
//! worklog-sync config init --timezone Europe/Oslo --default-target Jira
//! worklog-sync config list
//! ```
//!
//! ```toml
//! [[connections]]
//! id = 1
//! name = "My Toggl"
//! provider = "Toggl"
//! api_token = "..."
//! ```
//!
//! ## Usage Examples
//!
//! ### Synchronising
//! Import everything tracked since the first of March from connection 1, and check the
//! issues against connection 2:
//! ```bash
//! worklog-sync sync -s 1 -t 2 -f 2024-03-01
//! ```
//!
//! ### Reviewing and correcting
//! ```bash
//! worklog-sync show -r 12 --members
//! worklog-sync issues -r 12 "login page"
//! worklog-sync edit -w 345 -i ABC-123
//! worklog-sync validate -r 12
//! ```
//!
//! ### Finishing
//! ```bash
//! worklog-sync export -r 12
//! worklog-sync cancel -r 13
//! worklog-sync runs
//! ```
//!
use clap::Parser;
use cli::{Command, LogLevel, Opts};
use commands::{configuration, report};
use env_logger::Env;
use log::debug;
use std::env;
use std::fs::File;
use std::process::exit;

use worklog::{error::WorklogError, operation, ApplicationRuntime, Operation};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<(), WorklogError> {
    let opts: Opts = Opts::parse();

    configure_logging(&opts); // Handles the -v option

    let operation = match opts.cmd {
        Command::Sync(sync) => Operation::Sync(sync.into()),
        Command::Validate(run) => Operation::Validate(operation::validate::Validate {
            run_id: run.run_id,
        }),
        Command::Show(show) => Operation::Show(operation::show::Show {
            run_id: show.run_id,
            members: show.members,
        }),
        Command::Export(run) => Operation::Export(operation::export::Export { run_id: run.run_id }),
        Command::Cancel(run) => Operation::Cancel(operation::cancel::Cancel { run_id: run.run_id }),
        Command::Edit(edit) => Operation::Edit(edit.into()),
        Command::Del(del) => Operation::Del(operation::del::Del {
            worklog_id: del.worklog_id,
        }),
        Command::Issues(issues) => Operation::Issues(operation::issues::Issues {
            run_id: issues.run_id,
            term: issues.term,
        }),
        Command::Runs => Operation::Runs,
        Command::Providers => Operation::Providers,
        Command::Config(config) => {
            configuration::execute(config.cmd);
            return Ok(());
        }
    };

    let result = get_runtime().execute(operation).await?;
    report::print(&result);

    Ok(())
}

/// Creates the runtime from the configuration file, or exits
fn get_runtime() -> ApplicationRuntime {
    match ApplicationRuntime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            match err {
                WorklogError::ApplicationConfig { .. } => {
                    eprintln!(
                        "Configuration file not found. Use 'worklog-sync config init' to create it"
                    );
                }
                _ => {
                    eprintln!("Failed to create runtime: '{err}'");
                }
            }

            exit(1);
        }
    }
}

fn configure_logging(opts: &Opts) {
    let mut tmp_dir = env::temp_dir();
    tmp_dir.push("worklog-sync.log");

    if opts.verbosity.is_some() {
        println!("Logging to {}", &tmp_dir.to_string_lossy());
    }

    let target = Box::new(File::create(tmp_dir).expect("Can't create file"));

    // If nothing else was specified in RUST_LOG, use 'warn'
    env_logger::Builder::from_env(Env::default().default_filter_or(opts.verbosity.map_or(
        "warn",
        |lvl| match lvl {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        },
    )))
    .target(env_logger::Target::Pipe(target))
    .init();
    debug!("Logging started");
}

impl From<cli::Synchronisation> for operation::sync::Sync {
    fn from(val: cli::Synchronisation) -> Self {
        operation::sync::Sync {
            source: val.source,
            target: val.target,
            from: val.from,
        }
    }
}

impl From<cli::Edit> for operation::edit::Edit {
    fn from(val: cli::Edit) -> Self {
        operation::edit::Edit {
            worklog_id: val.worklog_id,
            comment: val.comment,
            issue_id: val.issue,
        }
    }
}
