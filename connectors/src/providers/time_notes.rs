//! Gitlab records spent time as system notes on an issue rather than as
//! separate entities. This module turns such a note stream into entries.
//!
//! Three note shapes are recognised:
//!
//! * `added 1d 2h 30m of time spent at 2024-03-01`
//! * `subtracted 1h of time spent at 2024-03-01`
//! * `removed time spent`, which discards everything seen so far
//!
//! A day counts as 8 hours. Notes written within the last day carry no
//! `at` date, those entries are stamped with the current instant.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::models::gitlab::Note;
use crate::RawEntry;

pub const MINED_COMMENT: &str = "No comment for Gitlab spent time...";

const SECONDS_PER_WORKDAY: i64 = 8 * 60 * 60;

lazy_static! {
    static ref ADDED: Regex = Regex::new(&spent_expr("added")).unwrap();
    static ref SUBTRACTED: Regex = Regex::new(&spent_expr("subtracted")).unwrap();
    static ref REMOVED: Regex = Regex::new(r"^removed time spent").unwrap();
}

fn spent_expr(verb: &str) -> String {
    format!(
        r"^{verb} ((?P<days>\d+)d\s)?((?P<hours>\d+)h\s)?((?P<minutes>\d+)m\s)?((?P<seconds>\d+)s\s)?of time spent(\sat\s(?P<date>[12]\d{{3}}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])))?"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeNote {
    Added {
        seconds: i64,
        date: Option<NaiveDate>,
    },
    Subtracted {
        seconds: i64,
        date: Option<NaiveDate>,
    },
    Removed,
}

fn group_value(caps: &Captures, name: &str) -> i64 {
    caps.name(name)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

fn spent(caps: &Captures) -> (i64, Option<NaiveDate>) {
    let seconds = group_value(caps, "days") * SECONDS_PER_WORKDAY
        + group_value(caps, "hours") * 3600
        + group_value(caps, "minutes") * 60
        + group_value(caps, "seconds");
    let date = caps
        .name("date")
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok());
    (seconds, date)
}

/// Classifies a note body, `None` for notes unrelated to time tracking
#[must_use]
pub fn classify(body: &str) -> Option<TimeNote> {
    if let Some(caps) = ADDED.captures(body) {
        let (seconds, date) = spent(&caps);
        Some(TimeNote::Added { seconds, date })
    } else if let Some(caps) = SUBTRACTED.captures(body) {
        let (seconds, date) = spent(&caps);
        Some(TimeNote::Subtracted { seconds, date })
    } else if REMOVED.is_match(body) {
        Some(TimeNote::Removed)
    } else {
        None
    }
}

fn at_date(date: Option<NaiveDate>, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    date.map_or(now, |d| d.and_time(NaiveTime::default()).and_utc().into())
}

/// Derives entries from the notes of one issue, scanned in the order given.
/// Subtractions are only honoured when `full_history` is set.
#[must_use]
pub fn mine_notes(
    notes: &[Note],
    project_id: i64,
    iid: i64,
    full_history: bool,
    now: DateTime<FixedOffset>,
) -> Vec<RawEntry> {
    let mut entries: Vec<RawEntry> = Vec::new();

    for note in notes {
        let (duration, date) = match classify(&note.body) {
            Some(TimeNote::Added { seconds, date }) => (seconds, date),
            Some(TimeNote::Subtracted { seconds, date }) if full_history => (-seconds, date),
            Some(TimeNote::Removed) => {
                entries.clear();
                continue;
            }
            _ => continue,
        };
        let started = at_date(date, now);
        entries.push(RawEntry {
            source_id: note.id.to_string(),
            duration,
            date_created: Some(note.created_at),
            date_started: started,
            date_stopped: started,
            comment: MINED_COMMENT.to_string(),
            issue_id: Some(iid.to_string()),
            project_id: Some(project_id.to_string()),
        });
    }
    entries
}
