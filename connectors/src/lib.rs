//!
//! `connectors` is a collection of adapters for the external time tracking and
//! issue tracking services a worklog can be imported from or exported to.
//!
//! Every adapter satisfies the same [`Connector`] capability contract, and the
//! [`ConnectorRegistry`] maps a provider name onto the matching adapter.
//! Providers lacking a read or write API answer with
//! [`ConnectorError::Unsupported`] rather than pretending to succeed.
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

pub mod client;
pub mod error;
pub mod models;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod xmlrpc;

pub use error::ConnectorError;
pub use registry::{ConnectorRegistry, ProviderKind};

pub type Result<T> = std::result::Result<T, ConnectorError>;

/// The stored connection settings an adapter is built from.
/// Which of the fields are used depends on the provider, the rest are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionFields {
    pub server: String,
    pub login: String,
    pub api_token: String,
    pub password: String,
    /// Per request, [`client::DEFAULT_TIMEOUT`] when unset
    pub timeout_secs: Option<u64>,
    /// Gitlab only, see [`providers::gitlab::GitlabConnector::with_full_history`]
    pub full_history: bool,
}

impl ConnectionFields {
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        self.timeout_secs
            .map_or(client::DEFAULT_TIMEOUT, std::time::Duration::from_secs)
    }
}

/// A time entry as delivered by a source provider, before any grouping or
/// issue reference extraction has taken place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEntry {
    /// Provider-native identifier of the entry
    pub source_id: String,
    /// Seconds; negative only for explicit subtract adjustments
    pub duration: i64,
    pub date_created: Option<DateTime<FixedOffset>>,
    pub date_started: DateTime<FixedOffset>,
    pub date_stopped: DateTime<FixedOffset>,
    pub comment: String,
    /// Provider specific issue fragment, i.e. the Gitlab issue iid
    pub issue_id: Option<String>,
    pub project_id: Option<String>,
}

/// A worklog to be created in the target system
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportWorklog {
    pub issue_id: String,
    pub date_started: DateTime<FixedOffset>,
    pub duration: i64,
    pub comment: String,
}

/// Result of pushing a batch of worklogs to a target.
///
/// Indices refer to positions in the slice handed to
/// [`Connector::export_worklogs`]. A rejected worklog addressed an issue the
/// target does not know about; it was skipped without aborting the batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed {
        rejected: Vec<usize>,
    },
    /// Entries `[0, index)` were handled, entry `index` failed and the
    /// remainder was never attempted.
    PartialFailure {
        index: usize,
        rejected: Vec<usize>,
        reason: String,
    },
}

impl ExportOutcome {
    #[must_use]
    pub fn rejected(&self) -> &[usize] {
        match self {
            ExportOutcome::Completed { rejected } | ExportOutcome::PartialFailure { rejected, .. } => {
                rejected
            }
        }
    }
}

/// An entry for interactive issue pickers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueSuggestion {
    pub id: String,
    pub label: String,
}

/// The capabilities every provider adapter offers.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fetches every finished time entry within `[start, end]`
    async fn import_worklogs(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawEntry>>;

    /// Creates the supplied worklogs in the target, strictly in the given order
    async fn export_worklogs(&self, worklogs: &[ExportWorklog]) -> Result<ExportOutcome>;

    /// Checks whether the issue reference resolves in the target system
    async fn validate_issue(&self, issue_id: &str) -> Result<bool>;

    /// Best-effort free text search for issues
    async fn search_issues(&self, term: &str) -> Result<Vec<IssueSuggestion>>;
}
