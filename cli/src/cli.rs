use std::fmt::{self, Formatter};

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub(crate) enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
/// Worklog synchronisation - move tracked time from a time tracker into an issue tracker
///
/// A synchronisation imports the entries of a source connection, groups them by day,
/// issue and comment, and checks the referenced issues against the target connection.
/// Review the result with `show`, correct it with `edit` or `del`, and finally `export` it.
///
/// Issue references are written at the start of the time entry's description, i.e.
/// `[ABC-123] code review` or `[Jira:ABC-123] code review`.
///
/// Dates are given in ISO8601 format without a time zone, i.e. `2024-03-01` or
/// `2024-03-01T08:00`. The time zone of the configuration is assumed.
#[command(author, version, about)] // Read from Cargo.toml
pub(crate) struct Opts {
    #[command(subcommand)]
    pub cmd: Command,

    #[arg(global = true, short, long)]
    pub verbosity: Option<LogLevel>,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Import entries from a source and check their issues against a target
    Sync(Synchronisation),
    /// Check the issue references of a synchronisation against the target again
    Validate(RunReference),
    /// List the worklogs of a synchronisation
    Show(Show),
    /// Send the valid worklogs of a synchronisation to the target
    Export(RunReference),
    /// Abandon a synchronisation
    Cancel(RunReference),
    /// Correct the comment or issue of a worklog
    Edit(Edit),
    /// Delete a worklog, members of an aggregate included
    Del(Del),
    /// Search the target of a synchronisation for issues
    Issues(Issues),
    /// List your synchronisations
    Runs,
    /// List the supported providers and the configured connections
    Providers,
    /// Subcommands for configuration
    Config(Config),
}

#[derive(Args)]
pub(crate) struct Synchronisation {
    /// Id of the connection to import from
    #[arg(short, long)]
    pub source: Option<i64>,
    /// Id of the connection to export to
    #[arg(short, long)]
    pub target: Option<i64>,
    /// Start of the window to import, i.e. `2024-03-01`
    #[arg(short, long, required = true)]
    pub from: String,
}

#[derive(Args)]
pub(crate) struct RunReference {
    /// Id of the synchronisation
    #[arg(short, long = "run", required = true)]
    pub run_id: i64,
}

#[derive(Args)]
pub(crate) struct Show {
    #[arg(short, long = "run", required = true)]
    pub run_id: i64,
    /// Lists the entries each aggregate was made of
    #[arg(short, long)]
    pub members: bool,
}

#[derive(Args)]
pub(crate) struct Edit {
    #[arg(short = 'w', long = "worklog", required = true)]
    pub worklog_id: i64,
    #[arg(short, long)]
    pub comment: Option<String>,
    /// Issue key, an empty string removes the reference
    #[arg(short, long)]
    pub issue: Option<String>,
}

#[derive(Args)]
pub(crate) struct Del {
    #[arg(short = 'w', long = "worklog", required = true)]
    pub worklog_id: i64,
}

#[derive(Args)]
pub(crate) struct Issues {
    #[arg(short, long = "run", required = true)]
    pub run_id: i64,
    /// Text to search for
    pub term: String,
}

#[derive(Args)]
pub(crate) struct Config {
    #[command(subcommand)]
    pub cmd: ConfigCommand,
}

/// Create or list the configuration file.
#[derive(Subcommand, Clone)]
pub(crate) enum ConfigCommand {
    /// Create a configuration file with your user settings and no connections
    Init(InitConfiguration),
    /// write current configuration to standard output, secrets blanked out
    List,
}

#[derive(Args, Clone)]
pub(crate) struct InitConfiguration {
    /// IANA time zone of your time entries, i.e. Europe/Oslo
    #[arg(short, long, default_value = "UTC")]
    pub timezone: String,
    /// Provider assumed for issue references without a provider prefix, i.e. Jira
    #[arg(short, long)]
    pub default_target: Option<String>,
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}
