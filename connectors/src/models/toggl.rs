use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A Toggl time entry. Entries still running have a negative `duration`
/// and no `stop`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeEntry {
    pub id: i64,
    pub duration: i64,
    pub at: Option<DateTime<FixedOffset>>,
    pub start: DateTime<FixedOffset>,
    pub stop: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub description: Option<String>,
}
