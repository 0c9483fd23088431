use std::{io, path::PathBuf};

use connectors::ConnectorError;
use thiserror::Error;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum WorklogError {
    #[error("Unable to load the application configuration file {path:?}")]
    ApplicationConfig { path: PathBuf, source: io::Error },
    #[error("Unable to parse contents of {path}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Unable to create configuration file {path}")]
    ConfigFileCreation { path: PathBuf },
    #[error("No provider named '{0}' is available")]
    UnknownProvider(String),
    #[error("Invalid source/target selection: {0}")]
    InvalidSelection(String),
    #[error("{operation} is not supported by {provider}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },
    #[error("Export stopped at worklog #{index}: {reason}")]
    ExportFailure { index: usize, reason: String },
    #[error("Synchronization {0} is no longer active")]
    InactiveRun(i64),
    #[error("Synchronization {0} is already completed")]
    AlreadyCompleted(i64),
    #[error("Provider request failed: {0}")]
    Connector(ConnectorError),
    #[error("Issue id pattern is unusable: {0}")]
    InvalidPattern(String),
    #[error("Unknown timezone '{0}'")]
    InvalidTimezone(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Could not make sense of input: {0}")]
    BadInput(String),
    #[error("SQL dbms error: {0}")]
    Sql(String),
    #[error("Mutex locking error")]
    LockPoisoned,
    #[error("Directory creation failed")]
    CreateDir(#[from] io::Error),
}

impl From<rusqlite::Error> for WorklogError {
    fn from(err: rusqlite::Error) -> Self {
        WorklogError::Sql(format!("Sqlite error {err}"))
    }
}

impl From<ConnectorError> for WorklogError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::UnknownProvider(name) => WorklogError::UnknownProvider(name),
            ConnectorError::Unsupported {
                provider,
                operation,
            } => WorklogError::Unsupported {
                provider,
                operation,
            },
            other => WorklogError::Connector(other),
        }
    }
}

impl From<regex::Error> for WorklogError {
    fn from(err: regex::Error) -> Self {
        WorklogError::InvalidPattern(format!("{err}"))
    }
}
