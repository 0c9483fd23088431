use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Tz;
use connectors::ConnectionFields;
use serde::{Deserialize, Serialize};

/// A persisted unit of tracked time, either imported from a source provider
/// or synthesized as the aggregate of several imported entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct WorklogRecord {
    pub id: i64,
    pub user_id: i64,
    pub synchronization_id: i64,
    pub date_started: DateTime<FixedOffset>,
    pub date_stopped: DateTime<FixedOffset>,
    /// `None` for aggregates
    pub date_created: Option<DateTime<FixedOffset>>,
    pub date_synchronized: DateTime<Utc>,
    /// Seconds, negative only for subtract adjustments
    pub duration: i64,
    pub comment: String,
    pub issue_id: Option<String>,
    /// `None` for aggregates
    pub source_id: Option<String>,
    pub is_valid: bool,
    /// `None` until the issue reference has been checked against the target
    pub is_issue_confirmed: Option<bool>,
    pub parent_id: Option<i64>,
}

impl WorklogRecord {
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Only top level, valid records are sent to the target
    #[must_use]
    pub fn is_exportable(&self) -> bool {
        self.is_top_level() && self.is_valid
    }
}

/// A worklog about to be written. The repository assigns the id and, for
/// members of a group, the parent id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorklog {
    pub user_id: i64,
    pub synchronization_id: i64,
    pub date_started: DateTime<FixedOffset>,
    pub date_stopped: DateTime<FixedOffset>,
    pub date_created: Option<DateTime<FixedOffset>>,
    pub date_synchronized: DateTime<Utc>,
    pub duration: i64,
    pub comment: String,
    pub issue_id: Option<String>,
    pub source_id: Option<String>,
    pub is_valid: bool,
}

/// Entries sharing day, issue and comment. With an `aggregate` present, all
/// `members` are stored as its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklogGroup {
    pub aggregate: Option<NewWorklog>,
    pub members: Vec<NewWorklog>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Active,
    Completed,
    Cancelled,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Active => write!(f, "active"),
            RunState::Completed => write!(f, "completed"),
            RunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One import, validate, export cycle between a source and a target connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynchronizationRun {
    pub id: i64,
    pub user_id: i64,
    /// Connection ids
    pub source_id: i64,
    pub target_id: i64,
    /// Wall clock time in the user's timezone
    pub date_started_from: NaiveDateTime,
    pub date_created: DateTime<Utc>,
    pub is_completed: bool,
    pub is_cancelled: bool,
}

impl SynchronizationRun {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !(self.is_completed || self.is_cancelled)
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        if self.is_completed {
            RunState::Completed
        } else if self.is_cancelled {
            RunState::Cancelled
        } else {
            RunState::Active
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSynchronization {
    pub user_id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub date_started_from: NaiveDateTime,
    pub date_created: DateTime<Utc>,
}

/// The settings of the user on whose behalf a synchronization runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub id: i64,
    pub timezone: Tz,
    pub issue_id_pattern: String,
    /// Provider name assumed for issue references without a provider prefix
    pub default_target: Option<String>,
}

/// A stored account at one of the providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConnection {
    pub id: i64,
    pub name: String,
    pub provider: String,
    pub server: String,
    pub login: String,
    pub api_token: String,
    pub password: String,
    pub timeout_secs: Option<u64>,
    pub full_history: bool,
    pub user_id: i64,
}

impl ProviderConnection {
    #[must_use]
    pub fn fields(&self) -> ConnectionFields {
        ConnectionFields {
            server: self.server.clone(),
            login: self.login.clone(),
            api_token: self.api_token.clone(),
            password: self.password.clone(),
            timeout_secs: self.timeout_secs,
            full_history: self.full_history,
        }
    }
}

/// Top level worklogs of a run with their totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run: SynchronizationRun,
    pub worklogs: Vec<WorklogRecord>,
    /// Seconds that are, or will be, sent to the target
    pub total_synchronized: i64,
    pub total_skipped: i64,
}

impl RunSummary {
    #[must_use]
    pub fn new(run: SynchronizationRun, worklogs: Vec<WorklogRecord>) -> Self {
        let (valid, invalid): (Vec<&WorklogRecord>, Vec<&WorklogRecord>) =
            worklogs.iter().partition(|w| w.is_valid);
        let total_synchronized = valid.iter().map(|w| w.duration).sum();
        let total_skipped = invalid.iter().map(|w| w.duration).sum();
        RunSummary {
            run,
            worklogs,
            total_synchronized,
            total_skipped,
        }
    }
}
